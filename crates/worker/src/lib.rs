//! # Opinion Worker
//!
//! Headless worker that turns a stream of submitted words into a live set of
//! semantic groups and mirrors one `{word, weight}` record per group.
//!
//! ## Loop
//!
//! ```text
//! MessageSource (id > cursor, ascending)
//!     │
//!     ├──> EmbeddingProvider ──> Embedding
//!     │
//!     ├──> ClusterSet::assign (+ merge sweep) ──> ClusterEvent[]
//!     │
//!     └──> PersistenceSynchronizer ──> CorrelationStore
//! ```
//!
//! Everything runs on one logical thread of control: an item, its merge
//! sweep and its store writes complete before the next item is fetched.

mod config;
mod consumer;
mod error;
mod stats;
mod sync;

pub use config::{EmbeddingConfig, StoreConfig, WorkerConfig};
pub use consumer::StreamConsumer;
pub use error::{Result, WorkerError};
pub use stats::ConsumerStats;
pub use sync::PersistenceSynchronizer;
