use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClusterError>;

#[derive(Error, Debug, PartialEq)]
pub enum ClusterError {
    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Embedding for '{0}' contains NaN or infinite values")]
    NonFiniteVector(String),

    #[error("Similarity threshold must lie strictly between 0 and 1, got {0}")]
    InvalidThreshold(f32),

    #[error("Embedding dimension must be positive")]
    ZeroDimension,
}
