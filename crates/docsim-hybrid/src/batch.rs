//! All-pairs comparison over a set of documents.

use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, instrument, warn};

use docsim_core::types::{is_duplicate, Representation, ScoreSource};
use docsim_core::{Error, Result};

use crate::engine::SimilarityEngine;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairScore {
    pub a: PathBuf,
    pub b: PathBuf,
    pub score: f32,
    pub source: ScoreSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub representation: Representation,
    pub pairs: Vec<PairScore>,
    pub mean: Option<f32>,
    pub max: Option<PairScore>,
    pub min: Option<PairScore>,
    /// Pairs at or above the duplicate threshold, highest first.
    pub duplicates: Vec<PairScore>,
    pub failures: Vec<(PathBuf, PathBuf, String)>,
}

impl BatchSummary {
    fn from_pairs(
        representation: Representation,
        pairs: Vec<PairScore>,
        failures: Vec<(PathBuf, PathBuf, String)>,
        threshold: f32,
    ) -> Self {
        let mean = (!pairs.is_empty()).then(|| pairs.iter().map(|p| p.score).sum::<f32>() / pairs.len() as f32);
        let max = pairs.iter().max_by(|x, y| x.score.total_cmp(&y.score)).cloned();
        let min = pairs.iter().min_by(|x, y| x.score.total_cmp(&y.score)).cloned();
        let mut duplicates: Vec<PairScore> = pairs.iter().filter(|p| is_duplicate(p.score, threshold)).cloned().collect();
        duplicates.sort_by(|x, y| y.score.total_cmp(&x.score));
        Self { representation, pairs, mean, max, min, duplicates, failures }
    }
}

impl SimilarityEngine {
    /// Compares every unordered pair of `paths`. Pairs that cannot be scored
    /// are listed in `failures`.
    #[instrument(skip(self, paths), fields(documents = paths.len()))]
    pub fn batch_analysis(&mut self, paths: &[PathBuf], representation: Representation) -> Result<BatchSummary> {
        if representation == Representation::Semantic && !self.has_semantic_capability() && self.semantic_index().is_none() {
            return Err(Error::NoEncoder);
        }
        let mut pairs = Vec::new();
        let mut failures = Vec::new();
        for (i, a) in paths.iter().enumerate() {
            for b in &paths[i + 1..] {
                match self.compare(a, b, representation) {
                    Ok(p) => pairs.push(PairScore { a: a.clone(), b: b.clone(), score: p.score, source: p.source }),
                    Err(e) => {
                        warn!(a = %a.display(), b = %b.display(), "pair skipped: {}", e);
                        failures.push((a.clone(), b.clone(), e.to_string()));
                    }
                }
            }
        }
        let summary = BatchSummary::from_pairs(representation, pairs, failures, self.settings().query.duplicate_threshold);
        info!(pairs = summary.pairs.len(), duplicates = summary.duplicates.len(), mean = ?summary.mean, "batch analysis finished");
        Ok(summary)
    }
}
