//! # Opinion Embeddings
//!
//! Word vectors for the opinion clustering worker.
//!
//! ## Providers
//!
//! - **Vector table**: static word vectors loaded once from a `.vec` text file
//! - **Stub**: deterministic hash-seeded vectors for smoke runs without model assets
//!
//! ## Architecture
//!
//! ```text
//! word
//!   │
//!   ├──> EmbeddingProvider (table | stub)
//!   │      └─> Embedding { vector[D], valid }
//!   │
//!   └──> similarity
//!          ├─> cosine_similarity (assignment, merge)
//!          └─> euclidean_distance (representative selection)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use opinion_embeddings::{EmbeddingProvider, VectorTable};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let table = VectorTable::load("vectors/ja.vec").await?;
//!     let carrot = table.embed("人参").await?;
//!     let radish = table.embed("大根").await?;
//!
//!     println!(
//!         "similarity: {:.3}",
//!         opinion_embeddings::cosine_similarity(&carrot.vector, &radish.vector)
//!     );
//!     Ok(())
//! }
//! ```

mod embeddings;
mod error;
mod similarity;
mod types;
mod vector_table;

pub use embeddings::{EmbeddingMode, EmbeddingModel, EmbeddingProvider, StubEmbedder};
pub use error::{EmbeddingError, Result};
pub use similarity::{cosine_similarity, euclidean_distance};
pub use types::Embedding;
pub use vector_table::VectorTable;
