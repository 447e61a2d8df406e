//! Knowledge base error types.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, KbError>;

#[derive(Debug, Error)]
pub enum KbError {
    #[error("LanceDB error: {0}")]
    LanceDb(String),

    #[error("Arrow error: {0}")]
    Arrow(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Paper not found: {0}")]
    NotFound(String),

    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    InvalidEmbeddingDimension { expected: usize, actual: usize },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

impl From<lancedb::Error> for KbError {
    fn from(err: lancedb::Error) -> Self {
        KbError::LanceDb(err.to_string())
    }
}

impl From<arrow_schema::ArrowError> for KbError {
    fn from(err: arrow_schema::ArrowError) -> Self {
        KbError::Arrow(err.to_string())
    }
}
