//! Batched semantic index construction.
//!
//! Documents are encoded `batch_size` at a time. A batch whose encoder call
//! fails, or returns the wrong shape or non-finite values, is recorded against each of its
//! documents and left out of the index; the remaining batches still land.

use anyhow::{anyhow, Result};
use chrono::Utc;
use std::path::PathBuf;
use tracing::{debug, info, instrument, warn};

use docsim_core::math::cosine;
use docsim_core::rows::{RowEntry, RowTable};
use docsim_core::traits::Embedder;
use docsim_core::types::DocumentRecord;

use crate::index::SemanticIndex;

pub struct SemanticBuild {
    pub index: Option<SemanticIndex>,
    /// Documents left out of the index and why.
    pub failures: Vec<(PathBuf, String)>,
}

pub struct SemanticIndexBuilder {
    batch_size: usize,
}

impl Default for SemanticIndexBuilder {
    fn default() -> Self {
        Self { batch_size: 32 }
    }
}

impl SemanticIndexBuilder {
    pub fn new(batch_size: usize) -> Self {
        Self { batch_size: batch_size.max(1) }
    }

    #[instrument(skip_all, fields(records = records.len(), model_id = embedder.model_id()))]
    pub fn build(&self, records: &[&DocumentRecord], embedder: &dyn Embedder) -> SemanticBuild {
        self.build_with_progress(records, embedder, |_, _| {})
    }

    /// Like `build`, calling `on_batch(done, total)` once before the first
    /// batch and after every batch. `total` counts the documents that will be
    /// sent to the encoder.
    pub fn build_with_progress<F>(&self, records: &[&DocumentRecord], embedder: &dyn Embedder, mut on_batch: F) -> SemanticBuild
    where
        F: FnMut(usize, usize),
    {
        let usable: Vec<&DocumentRecord> = records.iter().copied().filter(|r| !r.semantic_text.is_empty()).collect();
        let total = usable.len();
        let mut done = 0;
        on_batch(done, total);
        let mut entries = Vec::with_capacity(usable.len());
        let mut vectors = Vec::with_capacity(usable.len());
        let mut failures = Vec::new();

        for (n, chunk) in usable.chunks(self.batch_size).enumerate() {
            let texts: Vec<String> = chunk.iter().map(|r| r.semantic_text.clone()).collect();
            match encode_checked(embedder, &texts) {
                Ok(embs) => {
                    debug!(batch = n, size = chunk.len(), "batch encoded");
                    for (record, v) in chunk.iter().zip(embs) {
                        entries.push(RowEntry { path: record.path.clone(), content_hash: record.content_hash.clone() });
                        vectors.push(v);
                    }
                }
                Err(e) => {
                    let reason = format!("{:#}", e);
                    warn!(batch = n, size = chunk.len(), "semantic batch failed: {}", reason);
                    failures.extend(chunk.iter().map(|r| (r.path.clone(), reason.clone())));
                }
            }
            done += chunk.len();
            on_batch(done, total);
        }

        if vectors.is_empty() {
            warn!("no documents encoded; semantic index not built");
            return SemanticBuild { index: None, failures };
        }
        let rows = match RowTable::new(entries) {
            Ok(rows) => rows,
            Err(e) => {
                warn!("semantic index not built: {}", e);
                return SemanticBuild { index: None, failures };
            }
        };
        let index = SemanticIndex {
            model_id: embedder.model_id().to_string(),
            dim: embedder.dim(),
            rows,
            vectors,
            built_at: Utc::now(),
        };
        info!(documents = index.len(), failed = failures.len(), "semantic index built");
        SemanticBuild { index: Some(index), failures }
    }
}

/// Encodes `texts` and checks the encoder kept its contract.
pub fn encode_checked(embedder: &dyn Embedder, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    let embs = embedder.embed_batch(texts)?;
    if embs.len() != texts.len() {
        return Err(anyhow!("embedder returned {} vectors for {} texts", embs.len(), texts.len()));
    }
    let dim = embedder.dim();
    if let Some(v) = embs.iter().find(|v| v.len() != dim) {
        return Err(anyhow!("dim mismatch: got {} expected {}", v.len(), dim));
    }
    if let Some(i) = embs.iter().position(|v| v.iter().any(|x| !x.is_finite())) {
        return Err(anyhow!("embedder returned non-finite values for text {}", i));
    }
    Ok(embs)
}

/// Cosine of two semantic texts encoded together in one batch.
pub fn pairwise_similarity(a: &str, b: &str, embedder: &dyn Embedder) -> Result<f32> {
    let embs = encode_checked(embedder, &[a.to_string(), b.to_string()])?;
    Ok(cosine(&embs[0], &embs[1]))
}
