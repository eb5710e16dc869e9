// src/error.rs
// Standardized error types for engram

use thiserror::Error;

/// Main error type for the engram library
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("response parse error: {0}")]
    Parse(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown error: {0}")]
    Other(String),
}

/// Convenience type alias for Result using MemoryError
pub type Result<T> = std::result::Result<T, MemoryError>;

impl From<String> for MemoryError {
    fn from(s: String) -> Self {
        MemoryError::Other(s)
    }
}

impl From<tokio::task::JoinError> for MemoryError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            MemoryError::Cancelled
        } else {
            MemoryError::Other(err.to_string())
        }
    }
}
