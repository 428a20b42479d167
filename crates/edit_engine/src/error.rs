//! Error types for editing operations

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EditError {
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Clipboard payload is not valid shape data: {0}")]
    InvalidClipboard(#[from] serde_json::Error),

    #[error(transparent)]
    Scene(#[from] scene_model::SceneError),
}

pub type Result<T> = std::result::Result<T, EditError>;
