use crate::error::{EmbeddingError, Result};
use crate::types::Embedding;
use crate::vector_table::VectorTable;
use async_trait::async_trait;
use std::env;
use std::path::Path;

/// Maps a word to a fixed-dimension vector.
///
/// Implementations must be deterministic for a given word within a process
/// lifetime. Construction is expected to be expensive and happen once at
/// startup; the provider is then shared for the lifetime of the worker.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn dimension(&self) -> usize;

    async fn embed(&self, word: &str) -> Result<Embedding>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EmbeddingMode {
    Table,
    Stub,
}

impl EmbeddingMode {
    pub fn from_env() -> Result<Self> {
        let raw = env::var("OPINION_EMBEDDING_MODE").unwrap_or_else(|_| "table".to_string());
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "stub" => Ok(Self::Stub),
            other => Err(EmbeddingError::UnsupportedMode(other.to_string())),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Stub => "stub",
        }
    }
}

/// Deterministic pseudo-embeddings seeded from a hash of the word.
///
/// Every word is "known", and distinct words land on near-orthogonal unit
/// vectors, so only exact repeats cluster together.
#[derive(Clone, Debug)]
pub struct StubEmbedder {
    dimension: usize,
}

impl StubEmbedder {
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, word: &str) -> Result<Embedding> {
        Ok(Embedding::new(stub_embed(word, self.dimension)))
    }
}

/// Provider selected at startup from [`EmbeddingMode`].
pub enum EmbeddingModel {
    Table(VectorTable),
    Stub(StubEmbedder),
}

impl EmbeddingModel {
    /// Builds the provider for `mode`. Table mode requires a vector file and
    /// reads the dimension from it; stub mode uses `dimension`.
    pub async fn load(
        mode: EmbeddingMode,
        vectors: Option<&Path>,
        dimension: usize,
    ) -> Result<Self> {
        match mode {
            EmbeddingMode::Stub => {
                log::warn!("Using stub embeddings (dimension {dimension}); only exact repeats will cluster");
                Ok(Self::Stub(StubEmbedder::new(dimension)))
            }
            EmbeddingMode::Table => {
                let path = vectors.ok_or_else(|| {
                    EmbeddingError::Other(
                        "table embedding mode requires a vector file (OPINION_VECTORS)".to_string(),
                    )
                })?;
                Ok(Self::Table(VectorTable::load(path).await?))
            }
        }
    }

    pub const fn mode(&self) -> EmbeddingMode {
        match self {
            Self::Table(_) => EmbeddingMode::Table,
            Self::Stub(_) => EmbeddingMode::Stub,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for EmbeddingModel {
    fn dimension(&self) -> usize {
        match self {
            Self::Table(table) => table.dimension(),
            Self::Stub(stub) => stub.dimension(),
        }
    }

    async fn embed(&self, word: &str) -> Result<Embedding> {
        match self {
            Self::Table(table) => table.embed(word).await,
            Self::Stub(stub) => stub.embed(word).await,
        }
    }
}

fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for value in vec {
        *value /= norm;
    }
}

fn stub_embed(text: &str, dimension: usize) -> Vec<f32> {
    let mut state =
        fnv1a_64(text.as_bytes()) ^ (dimension as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let mut vec = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        let bits = splitmix64(&mut state);
        let high = (bits >> 32) as u32;
        let mantissa = high >> 9;
        let unit = f32::from_bits(0x3f80_0000 | mantissa) - 1.0;
        vec.push(unit.mul_add(2.0, -1.0));
    }
    normalize(&mut vec);
    vec
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

const fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::cosine_similarity;

    #[tokio::test]
    async fn stub_is_deterministic_and_normalized() {
        let stub = StubEmbedder::new(300);
        let a = stub.embed("人参").await.unwrap();
        let b = stub.embed("人参").await.unwrap();
        assert_eq!(a, b);
        assert!(a.valid);
        assert_eq!(a.dimension(), 300);

        let norm = a.vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn stub_separates_distinct_words() {
        let stub = StubEmbedder::new(300);
        let a = stub.embed("人参").await.unwrap();
        let b = stub.embed("バケツ").await.unwrap();
        assert!(cosine_similarity(&a.vector, &b.vector) < 0.5);
    }

    #[test]
    fn mode_parsing() {
        assert_eq!(EmbeddingMode::parse("TABLE").unwrap(), EmbeddingMode::Table);
        assert_eq!(EmbeddingMode::parse(" stub ").unwrap(), EmbeddingMode::Stub);
        let Err(err) = EmbeddingMode::parse("onnx") else {
            panic!("expected unsupported mode error");
        };
        assert!(err.to_string().contains("onnx"), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn table_mode_requires_vector_file() {
        let Err(err) = EmbeddingModel::load(EmbeddingMode::Table, None, 300).await else {
            panic!("expected missing vector file error");
        };
        assert!(err.to_string().contains("OPINION_VECTORS"));
    }
}
