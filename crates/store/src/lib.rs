//! # Opinion Store
//!
//! External state around the clustering engine.
//!
//! ## Collections
//!
//! ```text
//! <data_dir>/<namespace>/
//!     ├── messages.jsonl     append-only {id, word} records (input)
//!     └── correlations.json  {word, weight} per live cluster (output mirror)
//! ```
//!
//! Both collections have an in-memory implementation with the same contract
//! for tests and embedded use.

mod connect;
mod correlations;
mod error;
mod messages;
mod paths;
mod types;

pub use connect::{connect, RetryPolicy, StoreHandles};
pub use correlations::{CorrelationStore, JsonCorrelationStore, MemoryCorrelationStore};
pub use error::{Result, StoreError};
pub use messages::{JsonlMessageLog, MemoryMessageLog, MessageSource};
pub use paths::{correlations_path, messages_path, namespace_dir};
pub use types::{Correlation, MessageId, MessageRecord, CORRELATIONS_SCHEMA_VERSION};
