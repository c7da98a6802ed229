//! docsim-embed
//!
//! Built-in semantic encoder. `HashingEmbedder` projects words and adjacent
//! word pairs into a fixed number of signed buckets, so texts sharing
//! vocabulary land close together without any model weights on disk.

use anyhow::{anyhow, Result};
use std::hash::{Hash, Hasher};
use tracing::info;
use twox_hash::XxHash64;

use docsim_core::config::Settings;
use docsim_core::math::l2_normalize;
use docsim_core::traits::Embedder;

/// Weight of an adjacent word pair relative to a single word.
const PAIR_WEIGHT: f32 = 0.5;

pub struct HashingEmbedder {
    dim: usize,
    id: String,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(anyhow!("embedding dim must be positive"));
        }
        Ok(Self { dim, id: format!("hashing-xxh64:d{}", dim) })
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        let words: Vec<String> = text.split_whitespace().map(str::to_lowercase).collect();
        for w in &words {
            self.accumulate(&mut v, w.as_str(), 1.0);
        }
        for pair in words.windows(2) {
            self.accumulate(&mut v, (pair[0].as_str(), pair[1].as_str()), PAIR_WEIGHT);
        }
        l2_normalize(&mut v);
        v
    }

    fn accumulate<T: Hash>(&self, v: &mut [f32], feature: T, weight: f32) {
        let mut hasher = XxHash64::with_seed(0);
        feature.hash(&mut hasher);
        let h = hasher.finish();
        let idx = (h % self.dim as u64) as usize;
        let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
        v[idx] += sign * weight;
    }
}

impl Embedder for HashingEmbedder {
    fn model_id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

/// Encoder for the configured semantic settings, or `None` when semantic
/// indexing is switched off.
pub fn get_default_embedder(settings: &Settings) -> Result<Option<Box<dyn Embedder>>> {
    if !settings.semantic.enabled {
        info!("semantic encoder disabled by configuration");
        return Ok(None);
    }
    let embedder = HashingEmbedder::new(settings.semantic.dim)?;
    info!(model_id = embedder.model_id(), "using hashing encoder");
    Ok(Some(Box::new(embedder)))
}
