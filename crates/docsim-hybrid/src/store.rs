//! Change-aware document store.
//!
//! Records are keyed by absolute path and carry the BLAKE3 digest of the bytes
//! they were normalized from. A lookup always re-hashes the file; only a
//! digest match skips normalization.

use chrono::Utc;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use docsim_core::types::{DocumentRecord, Representation};
use docsim_core::{Error, Result};
use docsim_text::{extract_main_content, word_count, TextNormalizer};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub hits: u64,
    /// Normalization runs.
    pub misses: u64,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct IngestReport {
    /// Absolute paths of every document now current in the store, each once,
    /// in first-seen input order.
    pub processed: Vec<PathBuf>,
    pub failures: Vec<(PathBuf, String)>,
}

#[derive(Default)]
pub struct DocumentStore {
    records: IndexMap<PathBuf, DocumentRecord>,
    normalizer: TextNormalizer,
    stats: StoreStats,
}

pub fn content_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with previously persisted records. Later duplicates win.
    pub fn from_records(records: Vec<DocumentRecord>) -> Self {
        let records = records.into_iter().map(|r| (r.path.clone(), r)).collect();
        Self { records, ..Self::default() }
    }

    pub fn get_or_update(&mut self, path: &Path, force: bool) -> Result<DocumentRecord> {
        let path = fs::canonicalize(path).map_err(|e| Error::read(path, e))?;
        let bytes = fs::read(&path).map_err(|e| Error::read(&path, e))?;
        let hash = content_hash(&bytes);

        if !force {
            if let Some(existing) = self.records.get(&path).filter(|r| r.content_hash == hash) {
                self.stats.hits += 1;
                debug!(path = %path.display(), "document cache hit");
                return Ok(existing.clone());
            }
        }

        let raw = String::from_utf8(bytes).map_err(|e| Error::read(&path, e))?;
        let lexical_text = self.normalizer.normalize(&raw, Representation::Lexical);
        let semantic_text = self.normalizer.normalize(&raw, Representation::Semantic);
        let record = DocumentRecord {
            path: path.clone(),
            content_hash: hash,
            file_size: raw.len(),
            main_content_length: extract_main_content(&raw).chars().count(),
            lexical_word_count: word_count(&lexical_text),
            semantic_word_count: word_count(&semantic_text),
            lexical_text,
            semantic_text,
            processed_at: Utc::now(),
        };
        self.stats.misses += 1;
        debug!(path = %path.display(), force, "document normalized");
        self.records.insert(path, record.clone());
        Ok(record)
    }

    /// Brings every path up to date. Unreadable documents are reported, not fatal.
    /// Spellings that resolve to the same file count once.
    pub fn ingest(&mut self, paths: &[PathBuf], force: bool) -> IngestReport {
        let mut report = IngestReport::default();
        let mut seen = IndexSet::with_capacity(paths.len());
        for path in paths {
            match self.get_or_update(path, force) {
                Ok(record) => {
                    if !seen.insert(record.path) {
                        debug!(path = %path.display(), "duplicate input path");
                    }
                }
                Err(e) => {
                    warn!(path = %path.display(), "skipping document: {}", e);
                    report.failures.push((path.clone(), e.to_string()));
                }
            }
        }
        report.processed = seen.into_iter().collect();
        report
    }

    /// Snapshot in insertion order.
    pub fn all_records(&self) -> Vec<&DocumentRecord> {
        self.records.values().collect()
    }

    /// Records for `paths` in the given order; unknown paths are skipped.
    pub fn records_for(&self, paths: &[PathBuf]) -> Vec<&DocumentRecord> {
        paths.iter().filter_map(|p| self.records.get(p)).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn stats(&self) -> StoreStats {
        self.stats
    }
}
