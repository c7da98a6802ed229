//! docsim-hybrid
//!
//! Ties the pieces together: a change-aware document store, JSON cache
//! persistence, ranking, and `SimilarityEngine`, which answers pairwise and
//! nearest-neighbour queries over the lexical and semantic indexes.

pub mod batch;
pub mod cache;
pub mod engine;
pub mod query;
pub mod store;

pub use batch::{BatchSummary, PairScore};
pub use cache::{ArtifactStatus, CacheDir, LoadReport, SaveReport};
pub use engine::{BuildOutcome, BuildReport, EngineStats, SimilarityEngine};
pub use store::{DocumentStore, IngestReport, StoreStats};
