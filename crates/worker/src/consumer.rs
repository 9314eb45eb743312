use crate::error::Result;
use crate::stats::ConsumerStats;
use crate::sync::PersistenceSynchronizer;
use opinion_cluster::{ClusterEvent, ClusterSet};
use opinion_embeddings::EmbeddingProvider;
use opinion_store::{MessageId, MessageSource};
use std::sync::Arc;
use std::time::Duration;

/// Pulls new messages in id order and drives the cluster set.
///
/// Owns all cluster state; nothing else mutates it while the consumer runs.
pub struct StreamConsumer {
    source: Arc<dyn MessageSource>,
    embedder: Arc<dyn EmbeddingProvider>,
    clusters: ClusterSet,
    sync: PersistenceSynchronizer,
    cursor: Option<MessageId>,
    idle_interval: Duration,
    stats: ConsumerStats,
}

impl StreamConsumer {
    pub fn new(
        source: Arc<dyn MessageSource>,
        embedder: Arc<dyn EmbeddingProvider>,
        clusters: ClusterSet,
        sync: PersistenceSynchronizer,
        idle_interval: Duration,
    ) -> Self {
        Self {
            source,
            embedder,
            clusters,
            sync,
            cursor: None,
            idle_interval,
            stats: ConsumerStats::new(),
        }
    }

    /// Id of the last processed record; `None` until something was read.
    pub const fn cursor(&self) -> Option<MessageId> {
        self.cursor
    }

    pub const fn clusters(&self) -> &ClusterSet {
        &self.clusters
    }

    pub const fn stats(&self) -> &ConsumerStats {
        &self.stats
    }

    /// Embeds, clusters and persists one word.
    pub async fn process_word(&mut self, word: &str) -> Result<Vec<ClusterEvent>> {
        let embedding = self.embedder.embed(word).await?;
        let events = self.clusters.assign(word, &embedding)?;
        self.sync.apply(&events).await?;
        self.stats.record_events(&events);
        Ok(events)
    }

    /// Processes every record after the cursor. Returns how many were fetched.
    pub async fn poll_once(&mut self) -> Result<usize> {
        let records = self.source.fetch_after(self.cursor).await?;
        let fetched = records.len();

        for record in records {
            self.stats.items += 1;
            match record.word.as_deref() {
                Some(word) if !word.is_empty() => {
                    self.stats.words += 1;
                    self.process_word(word).await?;
                }
                _ => {
                    self.stats.skipped += 1;
                    log::debug!("Skipping message {} without a word", record.id);
                }
            }
            self.cursor = Some(record.id);
        }

        if fetched > 0 {
            log::debug!(
                "Processed {fetched} messages (cursor {:?}, {} clusters): {:?}",
                self.cursor,
                self.clusters.len(),
                self.stats
            );
        }
        Ok(fetched)
    }

    /// Main loop. Only returns on a fatal error.
    pub async fn run(&mut self) -> Result<()> {
        log::info!("System started. Listening...");
        loop {
            if self.poll_once().await? == 0 {
                tokio::time::sleep(self.idle_interval).await;
            }
        }
    }
}
