use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use docsim_core::math::cosine;
use docsim_core::rows::RowTable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticIndex {
    pub(crate) model_id: String,
    pub(crate) dim: usize,
    pub(crate) rows: RowTable,
    pub(crate) vectors: Vec<Vec<f32>>,
    pub(crate) built_at: DateTime<Utc>,
}

impl SemanticIndex {
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &RowTable {
        &self.rows
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn vector(&self, row: usize) -> Option<&[f32]> {
        self.vectors.get(row).map(Vec::as_slice)
    }

    /// Cosine of `query` against every stored vector, row-aligned.
    pub fn scores(&self, query: &[f32]) -> Vec<f32> {
        self.vectors.iter().map(|v| cosine(query, v)).collect()
    }

    pub fn row_similarity(&self, a: usize, b: usize) -> Option<f32> {
        Some(cosine(self.vectors.get(a)?, self.vectors.get(b)?))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.vectors.len() != self.rows.len() {
            return Err(format!("{} vectors for {} paths", self.vectors.len(), self.rows.len()));
        }
        if let Some(bad) = self.vectors.iter().position(|v| v.len() != self.dim) {
            return Err(format!("vector {} has {} dims, expected {}", bad, self.vectors[bad].len(), self.dim));
        }
        Ok(())
    }
}
