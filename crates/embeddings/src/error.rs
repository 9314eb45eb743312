use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EmbeddingError>;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Malformed vector file {path:?} at line {line}: {reason}")]
    ParseError {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Non-finite value in vector for '{0}'")]
    NonFinite(String),

    #[error("Unsupported embedding mode '{0}' (expected 'table' or 'stub')")]
    UnsupportedMode(String),

    #[error("Embedding error: {0}")]
    Other(String),
}
