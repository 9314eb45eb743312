use crate::embeddings::EmbeddingProvider;
use crate::error::{EmbeddingError, Result};
use crate::types::Embedding;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::task::spawn_blocking;
use unicode_segmentation::UnicodeSegmentation;

/// Static word vectors held in memory.
///
/// Loaded once from a word2vec/fastText text file: an optional `"<rows> <dim>"`
/// header followed by one `word v1 v2 … vD` row per line.
#[derive(Clone, Debug)]
pub struct VectorTable {
    dimension: usize,
    vectors: Arc<HashMap<String, Vec<f32>>>,
}

impl VectorTable {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        log::info!("Loading word vectors from {:?}", path);
        let text = tokio::fs::read_to_string(&path).await?;
        let (dimension, vectors) = spawn_blocking(move || parse_table(&path, &text))
            .await
            .map_err(|e| EmbeddingError::Other(format!("Join error: {e}")))??;
        log::info!(
            "Loaded {} word vectors (dimension {})",
            vectors.len(),
            dimension
        );
        Ok(Self {
            dimension,
            vectors: Arc::new(vectors),
        })
    }

    pub fn from_entries<I, S>(dimension: usize, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<f32>)>,
        S: Into<String>,
    {
        let mut vectors = HashMap::new();
        for (word, vector) in entries {
            if vector.len() != dimension {
                return Err(EmbeddingError::InvalidDimension {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            let word = word.into();
            if vector.iter().any(|v| !v.is_finite()) {
                return Err(EmbeddingError::NonFinite(word));
            }
            vectors.insert(word, vector);
        }
        Ok(Self {
            dimension,
            vectors: Arc::new(vectors),
        })
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.vectors.contains_key(word)
    }

    /// Exact lookup first, then the mean over the word's Unicode word segments.
    /// Segments missing from the table contribute zero vectors; the result is
    /// valid when at least one segment was found.
    fn lookup(&self, word: &str) -> Embedding {
        if let Some(vector) = self.vectors.get(word) {
            return Embedding::new(vector.clone());
        }

        let tokens: Vec<&str> = word.unicode_words().collect();
        if tokens.is_empty() {
            return Embedding::zero(self.dimension);
        }

        let mut sum = vec![0.0f32; self.dimension];
        let mut found = 0usize;
        for token in &tokens {
            if let Some(vector) = self.vectors.get(*token) {
                for (acc, value) in sum.iter_mut().zip(vector) {
                    *acc += value;
                }
                found += 1;
            }
        }
        if found == 0 {
            return Embedding::zero(self.dimension);
        }

        #[allow(clippy::cast_precision_loss)]
        let n = tokens.len() as f32;
        for value in &mut sum {
            *value /= n;
        }
        Embedding::new(sum)
    }
}

#[async_trait]
impl EmbeddingProvider for VectorTable {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, word: &str) -> Result<Embedding> {
        Ok(self.lookup(word))
    }
}

fn parse_table(path: &Path, text: &str) -> Result<(usize, HashMap<String, Vec<f32>>)> {
    let parse_error = |line: usize, reason: String| EmbeddingError::ParseError {
        path: path.to_path_buf(),
        line,
        reason,
    };

    let mut dimension: Option<usize> = None;
    let mut vectors = HashMap::new();

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim_end();
        if line.is_empty() {
            continue;
        }

        let mut fields = line.split_whitespace();
        let Some(word) = fields.next() else {
            continue;
        };
        let rest: Vec<&str> = fields.collect();

        if vectors.is_empty() && dimension.is_none() && rest.len() == 1 {
            if let (Ok(_rows), Ok(dim)) = (word.parse::<usize>(), rest[0].parse::<usize>()) {
                if dim == 0 {
                    return Err(parse_error(line_no, "header declares dimension 0".into()));
                }
                dimension = Some(dim);
                continue;
            }
        }

        let mut vector = Vec::with_capacity(rest.len());
        for value in &rest {
            let parsed = value
                .parse::<f32>()
                .map_err(|e| parse_error(line_no, format!("'{value}' is not a number ({e})")))?;
            if !parsed.is_finite() {
                return Err(parse_error(
                    line_no,
                    format!("'{value}' is not a finite number"),
                ));
            }
            vector.push(parsed);
        }

        match dimension {
            None => {
                if vector.is_empty() {
                    return Err(parse_error(line_no, format!("row '{word}' has no values")));
                }
                dimension = Some(vector.len());
            }
            Some(expected) if expected != vector.len() => {
                return Err(EmbeddingError::InvalidDimension {
                    expected,
                    actual: vector.len(),
                });
            }
            Some(_) => {}
        }

        vectors.insert(word.to_string(), vector);
    }

    let dimension = dimension
        .ok_or_else(|| parse_error(0, "vector file contains no rows".to_string()))?;
    Ok((dimension, vectors))
}
