//! # Opinion Cluster
//!
//! Online, incremental clustering of short opinion words.
//!
//! Each incoming word either joins the most similar existing [`Cluster`]
//! (cosine similarity of its embedding against the cluster centroid above a
//! threshold) or starts a new one. After every assignment a merge sweep
//! agglomerates clusters whose centroids have drifted within the threshold of
//! each other, until no such pair remains.
//!
//! ## Pipeline
//!
//! ```text
//! (word, Embedding)
//!     │
//!     ├──> ClusterSet::assign
//!     │      ├─> exact-representative override
//!     │      ├─> best centroid above threshold ──> Cluster::assign
//!     │      └─> none ──> Cluster::create
//!     │
//!     └──> ClusterSet::merge_sweep (repeat passes until no merge)
//!            └─> Cluster::absorb
//!
//! every mutation ──> ClusterEvent
//! ```
//!
//! ## Example
//!
//! ```
//! use opinion_cluster::{ClusterSet, ClusterSetConfig};
//! use opinion_embeddings::Embedding;
//!
//! let config = ClusterSetConfig::new(0.63, 2).unwrap();
//! let mut set = ClusterSet::new(config);
//!
//! set.assign("人参", &Embedding::new(vec![1.0, 0.0])).unwrap();
//! set.assign("大根", &Embedding::new(vec![0.7, 0.714])).unwrap();
//!
//! assert_eq!(set.len(), 1);
//! assert_eq!(set.clusters()[0].count(), 2);
//! ```

mod cluster;
mod cluster_set;
mod error;
mod events;
mod representative;

pub use cluster::{Cluster, Member};
pub use cluster_set::{ClusterSet, ClusterSetConfig, OovPolicy};
pub use error::{ClusterError, Result};
pub use events::ClusterEvent;
pub use representative::RepresentativePolicy;
