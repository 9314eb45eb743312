use crate::error::{Result, StoreError};
use crate::types::{Correlation, CORRELATIONS_SCHEMA_VERSION};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Keyed `{word, weight}` records mirroring the live cluster set.
///
/// The clustering worker is assumed to be the only writer.
#[async_trait]
pub trait CorrelationStore: Send + Sync {
    /// Adds a new key. Fails with [`StoreError::DuplicateKey`] if it exists.
    async fn insert(&self, word: &str, weight: u64) -> Result<()>;

    /// Sets the weight for `word`, creating the key if absent.
    async fn upsert(&self, word: &str, weight: u64) -> Result<()>;

    /// Removes `word`. Returns whether the key existed.
    async fn delete(&self, word: &str) -> Result<bool>;

    /// Removes every key. Returns how many were removed.
    async fn clear(&self) -> Result<usize>;

    /// All entries ordered by word.
    async fn entries(&self) -> Result<Vec<Correlation>>;
}

fn to_entries(map: &BTreeMap<String, u64>) -> Vec<Correlation> {
    map.iter()
        .map(|(word, weight)| Correlation::new(word.clone(), *weight))
        .collect()
}

#[derive(Debug, Default)]
pub struct MemoryCorrelationStore {
    entries: Mutex<BTreeMap<String, u64>>,
}

impl MemoryCorrelationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CorrelationStore for MemoryCorrelationStore {
    async fn insert(&self, word: &str, weight: u64) -> Result<()> {
        let mut guard = self.entries.lock().await;
        if guard.contains_key(word) {
            return Err(StoreError::DuplicateKey(word.to_string()));
        }
        guard.insert(word.to_string(), weight);
        Ok(())
    }

    async fn upsert(&self, word: &str, weight: u64) -> Result<()> {
        self.entries.lock().await.insert(word.to_string(), weight);
        Ok(())
    }

    async fn delete(&self, word: &str) -> Result<bool> {
        Ok(self.entries.lock().await.remove(word).is_some())
    }

    async fn clear(&self) -> Result<usize> {
        let mut guard = self.entries.lock().await;
        let removed = guard.len();
        guard.clear();
        Ok(removed)
    }

    async fn entries(&self) -> Result<Vec<Correlation>> {
        Ok(to_entries(&*self.entries.lock().await))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedCorrelations {
    schema_version: u32,
    correlations: Vec<Correlation>,
}

/// Correlations kept in a single JSON document.
///
/// Every mutation rewrites the file (temp file + rename) before the in-memory
/// copy changes, so readers never see a half-written document and a failed
/// write leaves both copies as they were.
#[derive(Debug)]
pub struct JsonCorrelationStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, u64>>,
}

impl JsonCorrelationStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let persisted: PersistedCorrelations = serde_json::from_slice(&bytes)?;
                if persisted.schema_version != CORRELATIONS_SCHEMA_VERSION {
                    return Err(StoreError::SchemaMismatch {
                        path,
                        found: persisted.schema_version,
                        expected: CORRELATIONS_SCHEMA_VERSION,
                    });
                }
                persisted
                    .correlations
                    .into_iter()
                    .map(|c| (c.word, c.weight))
                    .collect()
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let empty = BTreeMap::new();
                write_document(&path, &empty).await?;
                empty
            }
            Err(err) => return Err(err.into()),
        };

        log::debug!("Opened correlation store {:?} ({} entries)", path, entries.len());
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn commit<F, T>(&self, mutate: F) -> Result<T>
    where
        F: FnOnce(&mut BTreeMap<String, u64>) -> Result<T> + Send,
        T: Send,
    {
        let mut guard = self.entries.lock().await;
        let mut next = guard.clone();
        let out = mutate(&mut next)?;
        write_document(&self.path, &next).await?;
        *guard = next;
        Ok(out)
    }
}

async fn write_document(path: &Path, entries: &BTreeMap<String, u64>) -> Result<()> {
    let persisted = PersistedCorrelations {
        schema_version: CORRELATIONS_SCHEMA_VERSION,
        correlations: to_entries(entries),
    };
    let bytes = serde_json::to_vec_pretty(&persisted)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl CorrelationStore for JsonCorrelationStore {
    async fn insert(&self, word: &str, weight: u64) -> Result<()> {
        self.commit(|map| {
            if map.contains_key(word) {
                return Err(StoreError::DuplicateKey(word.to_string()));
            }
            map.insert(word.to_string(), weight);
            Ok(())
        })
        .await
    }

    async fn upsert(&self, word: &str, weight: u64) -> Result<()> {
        self.commit(|map| {
            map.insert(word.to_string(), weight);
            Ok(())
        })
        .await
    }

    async fn delete(&self, word: &str) -> Result<bool> {
        if !self.entries.lock().await.contains_key(word) {
            return Ok(false);
        }
        self.commit(|map| Ok(map.remove(word).is_some())).await
    }

    async fn clear(&self) -> Result<usize> {
        self.commit(|map| {
            let removed = map.len();
            map.clear();
            Ok(removed)
        })
        .await
    }

    async fn entries(&self) -> Result<Vec<Correlation>> {
        Ok(to_entries(&*self.entries.lock().await))
    }
}
