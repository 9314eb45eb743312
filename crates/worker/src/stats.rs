use opinion_cluster::ClusterEvent;
use serde::{Deserialize, Serialize};

/// Counters for one consumer lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerStats {
    /// Records fetched, including ones without a word
    pub items: u64,

    /// Records that carried a word
    pub words: u64,

    /// Records skipped for lacking a word
    pub skipped: u64,

    pub created: u64,
    pub joined: u64,
    pub renamed: u64,
    pub merged: u64,
    pub dropped: u64,
}

impl ConsumerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_events(&mut self, events: &[ClusterEvent]) {
        for event in events {
            match event {
                ClusterEvent::Created { .. } => self.created += 1,
                ClusterEvent::Joined { .. } => self.joined += 1,
                ClusterEvent::Merged { .. } => self.merged += 1,
                ClusterEvent::Dropped { .. } => self.dropped += 1,
            }
            if event.renamed() {
                self.renamed += 1;
            }
        }
    }
}
