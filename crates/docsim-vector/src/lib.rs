//! docsim-vector
//!
//! Dense semantic index: one encoder vector per document, row-aligned with a
//! `RowTable`, built in batches through any `Embedder`.

pub mod index;
pub mod index_build;

pub use index_build::{pairwise_similarity, SemanticBuild, SemanticIndexBuilder};
pub use index::SemanticIndex;
