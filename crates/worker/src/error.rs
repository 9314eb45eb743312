use opinion_cluster::ClusterError;
use opinion_embeddings::EmbeddingError;
use opinion_store::StoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WorkerError>;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Cluster error: {0}")]
    Cluster(#[from] ClusterError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
