//! Similarity engine: the document store, both indexes, the optional encoder
//! and the cache directory they persist to.
//!
//! Indexes are only replaced by a completed build. A build that produces
//! nothing leaves the previous index in place.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

use docsim_core::config::Settings;
use docsim_core::traits::Embedder;
use docsim_core::types::{
    DocumentRecord, FindSimilarResult, LexicalResult, Method, PairSimilarity, QueryResultEntry, Representation,
    ScoreSource, SemanticResult,
};
use docsim_core::{Error, Result};
use docsim_text::{LexicalIndex, LexicalIndexBuilder, TfidfConfig};
use docsim_vector::index_build::encode_checked;
use docsim_vector::{SemanticIndex, SemanticIndexBuilder};

use crate::cache::{CacheDir, LoadReport, SaveReport};
use crate::query::rank;
use crate::store::{DocumentStore, IngestReport, StoreStats};

/// Queries whose terms are mostly outside the vocabulary score poorly.
const LOW_COVERAGE: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildOutcome {
    /// Not requested.
    Skipped,
    /// Replaced the index; this many rows.
    Built(usize),
    /// Nothing to index; any previous index was kept.
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    pub ingest: IngestReport,
    pub lexical: BuildOutcome,
    pub semantic: BuildOutcome,
    /// Documents the encoder failed on.
    pub encode_failures: Vec<(PathBuf, String)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStats {
    pub total_documents: usize,
    pub documents_with_lexical_text: usize,
    pub lexical_indexed: usize,
    pub semantic_indexed: usize,
    pub vocab_size: Option<usize>,
    pub dim: Option<usize>,
    pub model_id: Option<String>,
    pub lexical_built_at: Option<DateTime<Utc>>,
    pub semantic_built_at: Option<DateTime<Utc>>,
    pub semantic_capable: bool,
    pub store: StoreStats,
}

pub struct SimilarityEngine {
    settings: Settings,
    cache: Option<CacheDir>,
    load_report: LoadReport,
    store: DocumentStore,
    lexical: Option<LexicalIndex>,
    semantic: Option<SemanticIndex>,
    embedder: Option<Box<dyn Embedder>>,
}

impl SimilarityEngine {
    /// Opens the engine on `settings.cache_dir()`, loading whatever artifacts
    /// are there and usable.
    pub fn open(settings: Settings, embedder: Option<Box<dyn Embedder>>) -> Result<Self> {
        settings.validate()?;
        let cache = CacheDir::new(settings.cache_dir());
        let (loaded, load_report) = cache.load();
        Ok(Self {
            store: DocumentStore::from_records(loaded.documents),
            lexical: loaded.lexical,
            semantic: loaded.semantic,
            cache: Some(cache),
            load_report,
            settings,
            embedder,
        })
    }

    /// Engine without a cache directory; `flush` is a no-op.
    pub fn in_memory(settings: Settings, embedder: Option<Box<dyn Embedder>>) -> Self {
        Self {
            settings,
            cache: None,
            load_report: LoadReport::default(),
            store: DocumentStore::new(),
            lexical: None,
            semantic: None,
            embedder,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn load_report(&self) -> &LoadReport {
        &self.load_report
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn lexical_index(&self) -> Option<&LexicalIndex> {
        self.lexical.as_ref()
    }

    pub fn semantic_index(&self) -> Option<&SemanticIndex> {
        self.semantic.as_ref()
    }

    pub fn has_semantic_capability(&self) -> bool {
        self.embedder.is_some()
    }

    pub fn ingest(&mut self, paths: &[PathBuf], force: bool) -> IngestReport {
        self.store.ingest(paths, force)
    }

    #[instrument(skip(self, paths), fields(documents = paths.len()))]
    pub fn build(&mut self, paths: &[PathBuf], method: Method, force: bool) -> BuildReport {
        self.build_with_progress(paths, method, force, |_, _| {})
    }

    /// Like `build`; `on_encoded(done, total)` tracks the semantic encoding
    /// pass, where `total` is the number of documents sent to the encoder.
    pub fn build_with_progress<F>(&mut self, paths: &[PathBuf], method: Method, force: bool, on_encoded: F) -> BuildReport
    where
        F: FnMut(usize, usize),
    {
        let ingest = self.store.ingest(paths, force);
        let records = self.store.records_for(&ingest.processed);
        let mut lexical = BuildOutcome::Skipped;
        let mut semantic = BuildOutcome::Skipped;
        let mut encode_failures = Vec::new();

        if method.includes(Representation::Lexical) {
            let builder = LexicalIndexBuilder::new(TfidfConfig::from(&self.settings.lexical));
            lexical = match builder.build(&records) {
                Some(index) => {
                    let n = index.len();
                    self.lexical = Some(index);
                    BuildOutcome::Built(n)
                }
                None => BuildOutcome::Empty,
            };
        }

        if method.includes(Representation::Semantic) {
            semantic = match self.embedder.as_deref() {
                None => {
                    warn!("semantic build requested without an encoder");
                    BuildOutcome::Empty
                }
                Some(embedder) => {
                    let builder = SemanticIndexBuilder::new(self.settings.semantic.batch_size);
                    let built = builder.build_with_progress(&records, embedder, on_encoded);
                    encode_failures = built.failures;
                    match built.index {
                        Some(index) => {
                            let n = index.len();
                            self.semantic = Some(index);
                            BuildOutcome::Built(n)
                        }
                        None => BuildOutcome::Empty,
                    }
                }
            };
        }

        info!(
            processed = ingest.processed.len(),
            failed = ingest.failures.len(),
            ?lexical,
            ?semantic,
            "build finished"
        );
        BuildReport { ingest, lexical, semantic, encode_failures }
    }

    #[instrument(skip(self, query), fields(path = %query.display()))]
    pub fn find_similar(&mut self, query: &Path, method: Method, top_k: usize) -> Result<FindSimilarResult> {
        let record = self.store.get_or_update(query, false)?;
        let mut result = FindSimilarResult::default();
        let mut first_err = None;

        if method.includes(Representation::Lexical) {
            match self.lexical_result(&record, top_k) {
                Ok(r) => result.lexical = Some(r),
                Err(e) if method == Method::Both && e.is_unavailable() => first_err = Some(e),
                Err(e) => return Err(e),
            }
        }
        if method.includes(Representation::Semantic) {
            match self.semantic_result(&record, top_k) {
                Ok(r) => result.semantic = Some(r),
                Err(e) if method == Method::Both && e.is_unavailable() => {
                    first_err.get_or_insert(e);
                }
                Err(e) => return Err(e),
            }
        }

        if result.lexical.is_none() && result.semantic.is_none() {
            return Err(first_err.unwrap_or(Error::NotIndexed(Representation::Lexical)));
        }
        if let Some(e) = first_err {
            warn!("answering with one representation only: {}", e);
        }
        Ok(result)
    }

    /// Ranked neighbours of `query` in one representation.
    pub fn top_k(&mut self, query: &Path, representation: Representation, k: usize) -> Result<Vec<QueryResultEntry>> {
        let record = self.store.get_or_update(query, false)?;
        Ok(match representation {
            Representation::Lexical => self.lexical_result(&record, k)?.entries,
            Representation::Semantic => self.semantic_result(&record, k)?.entries,
        })
    }

    /// Raw row-aligned similarities of `query`, self row included.
    pub fn scores(&mut self, query: &Path, representation: Representation) -> Result<Vec<f32>> {
        let record = self.store.get_or_update(query, false)?;
        match representation {
            Representation::Lexical => {
                let index = self.lexical.as_ref().ok_or(Error::NotIndexed(representation))?;
                Ok(index.scores(&index.project(&record.lexical_text)))
            }
            Representation::Semantic => {
                let (index, query) = self.semantic_query(&record)?;
                Ok(index.scores(&query))
            }
        }
    }

    /// Similarity of two documents, read from the index when both rows are
    /// current and computed on the fly otherwise.
    pub fn compare(&mut self, a: &Path, b: &Path, representation: Representation) -> Result<PairSimilarity> {
        let ra = self.store.get_or_update(a, false)?;
        let rb = self.store.get_or_update(b, false)?;
        let indexed = match representation {
            Representation::Lexical => self.lexical.as_ref().and_then(|ix| {
                let i = ix.rows().current_row(&ra.path, &ra.content_hash)?;
                let j = ix.rows().current_row(&rb.path, &rb.content_hash)?;
                ix.row_similarity(i, j)
            }),
            Representation::Semantic => self.semantic.as_ref().and_then(|ix| {
                let i = ix.rows().current_row(&ra.path, &ra.content_hash)?;
                let j = ix.rows().current_row(&rb.path, &rb.content_hash)?;
                ix.row_similarity(i, j)
            }),
        };
        if let Some(score) = indexed {
            return Ok(PairSimilarity { representation, score, source: ScoreSource::Index });
        }
        warn!(
            a = %ra.path.display(),
            b = %rb.path.display(),
            "{} index lacks a current row for the pair; computing it directly",
            representation
        );
        let score = self.pair_score(&ra, &rb, representation)?;
        Ok(PairSimilarity { representation, score, source: ScoreSource::Ephemeral })
    }

    /// Similarity of two documents from a throwaway two-document index.
    pub fn similarity(&mut self, a: &Path, b: &Path, representation: Representation) -> Result<f32> {
        let ra = self.store.get_or_update(a, false)?;
        let rb = self.store.get_or_update(b, false)?;
        self.pair_score(&ra, &rb, representation)
    }

    /// Drops an index from memory and from the cache directory.
    pub fn clear_index(&mut self, representation: Representation) -> Result<bool> {
        let had = match representation {
            Representation::Lexical => self.lexical.take().is_some(),
            Representation::Semantic => self.semantic.take().is_some(),
        };
        let removed = match &self.cache {
            Some(cache) => cache.remove(representation)?,
            None => false,
        };
        info!(%representation, "index cleared");
        Ok(had || removed)
    }

    pub fn stats(&self) -> EngineStats {
        let records = self.store.all_records();
        EngineStats {
            total_documents: records.len(),
            documents_with_lexical_text: records.iter().filter(|r| !r.lexical_text.is_empty()).count(),
            lexical_indexed: self.lexical.as_ref().map_or(0, LexicalIndex::len),
            semantic_indexed: self.semantic.as_ref().map_or(0, SemanticIndex::len),
            vocab_size: self.lexical.as_ref().map(LexicalIndex::vocab_size),
            dim: self.semantic.as_ref().map(SemanticIndex::dim),
            model_id: self.semantic.as_ref().map(|s| s.model_id().to_string()),
            lexical_built_at: self.lexical.as_ref().map(LexicalIndex::built_at),
            semantic_built_at: self.semantic.as_ref().map(SemanticIndex::built_at),
            semantic_capable: self.has_semantic_capability(),
            store: self.store.stats(),
        }
    }

    /// Persists the store and any non-empty index.
    pub fn flush(&self) -> Result<SaveReport> {
        match &self.cache {
            Some(cache) => cache.save(&self.store.all_records(), self.lexical.as_ref(), self.semantic.as_ref()),
            None => Ok(SaveReport::default()),
        }
    }

    fn lexical_result(&self, record: &DocumentRecord, top_k: usize) -> Result<LexicalResult> {
        let index = self.lexical.as_ref().ok_or(Error::NotIndexed(Representation::Lexical))?;
        let coverage = index.vectorizer().coverage(&record.lexical_text);
        if coverage < LOW_COVERAGE {
            warn!(path = %record.path.display(), coverage, "most query terms are outside the lexical vocabulary");
        }
        let scores = index.scores(&index.project(&record.lexical_text));
        Ok(LexicalResult {
            entries: rank(&scores, index.rows(), Some(&record.path), top_k),
            vocab_size: index.vocab_size(),
            coverage,
        })
    }

    fn semantic_result(&self, record: &DocumentRecord, top_k: usize) -> Result<SemanticResult> {
        let (index, query) = self.semantic_query(record)?;
        let scores = index.scores(&query);
        Ok(SemanticResult {
            entries: rank(&scores, index.rows(), Some(&record.path), top_k),
            model_id: index.model_id().to_string(),
            dim: index.dim(),
        })
    }

    fn semantic_query(&self, record: &DocumentRecord) -> Result<(&SemanticIndex, Vec<f32>)> {
        let embedder = self.embedder.as_deref().ok_or(Error::NoEncoder)?;
        let index = self.semantic.as_ref().ok_or(Error::NotIndexed(Representation::Semantic))?;
        if embedder.model_id() != index.model_id() {
            return Err(Error::ModelMismatch { index: index.model_id().to_string(), encoder: embedder.model_id().to_string() });
        }
        let vector = encode_checked(embedder, &[record.semantic_text.clone()])
            .map_err(|e| Error::Encoding(format!("{:#}", e)))?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Encoding("encoder returned no vector".into()))?;
        Ok((index, vector))
    }

    fn pair_score(&self, a: &DocumentRecord, b: &DocumentRecord, representation: Representation) -> Result<f32> {
        match representation {
            Representation::Lexical => {
                docsim_text::pairwise_similarity(&a.lexical_text, &b.lexical_text).ok_or(Error::EmptyCorpus)
            }
            Representation::Semantic => {
                let embedder = self.embedder.as_deref().ok_or(Error::NoEncoder)?;
                if a.semantic_text.is_empty() && b.semantic_text.is_empty() {
                    return Err(Error::EmptyCorpus);
                }
                docsim_vector::pairwise_similarity(&a.semantic_text, &b.semantic_text, embedder)
                    .map_err(|e| Error::Encoding(format!("{:#}", e)))
            }
        }
    }
}
