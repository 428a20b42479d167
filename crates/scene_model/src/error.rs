//! Error types for scene model operations

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("Unknown shape kind: {0}")]
    UnknownKind(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SceneError>;
