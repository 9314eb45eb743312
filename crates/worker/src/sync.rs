use crate::error::Result;
use opinion_cluster::ClusterEvent;
use opinion_store::CorrelationStore;
use std::sync::Arc;

/// Replays cluster events into the correlation store, write-through.
///
/// After each `apply` the store holds exactly one `(representative, count)`
/// entry per live cluster. A failed write is returned as-is: there is no
/// compensating rollback of the in-memory cluster state.
#[derive(Clone)]
pub struct PersistenceSynchronizer {
    store: Arc<dyn CorrelationStore>,
}

impl PersistenceSynchronizer {
    pub fn new(store: Arc<dyn CorrelationStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn CorrelationStore> {
        &self.store
    }

    /// Empties the store so it mirrors a fresh, empty cluster set.
    pub async fn reset(&self) -> Result<usize> {
        let removed = self.store.clear().await?;
        if removed > 0 {
            log::info!("Cleared {removed} stale correlations");
        }
        Ok(removed)
    }

    pub async fn apply(&self, events: &[ClusterEvent]) -> Result<()> {
        for event in events {
            self.apply_one(event).await?;
        }
        Ok(())
    }

    async fn apply_one(&self, event: &ClusterEvent) -> Result<()> {
        match event {
            ClusterEvent::Created { word } => {
                self.store.insert(word, 1).await?;
            }
            ClusterEvent::Joined {
                previous,
                representative,
                count,
                ..
            } => {
                if previous != representative {
                    self.store.delete(previous).await?;
                }
                self.store.upsert(representative, *count).await?;
            }
            ClusterEvent::Merged {
                absorbed,
                previous,
                representative,
                count,
                ..
            } => {
                self.store.delete(absorbed).await?;
                if previous != representative {
                    self.store.delete(previous).await?;
                }
                self.store.upsert(representative, *count).await?;
            }
            ClusterEvent::Dropped { .. } => {}
        }
        Ok(())
    }
}
