//! Error types for the operator surface

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OperatorError {
    #[error("Graph has no active page")]
    NoActivePage,

    #[error("Page not found: {0}")]
    PageNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Payload is not valid JSON: {0}")]
    Payload(#[from] serde_json::Error),

    #[error(transparent)]
    Scene(#[from] scene_model::SceneError),

    #[error(transparent)]
    Edit(#[from] edit_engine::EditError),
}

pub type Result<T> = std::result::Result<T, OperatorError>;
