use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, instrument, warn};

use docsim_core::math::SparseVector;
use docsim_core::rows::{RowEntry, RowTable};
use docsim_core::types::DocumentRecord;

use crate::tfidf::{TfidfConfig, TfidfVectorizer};

/// TF-IDF rows for a fixed document set.
///
/// `matrix[i]` is the weight vector of `rows.entry(i)`. The vocabulary is
/// fitted once over exactly these documents; adding a document means a rebuild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexicalIndex {
    vectorizer: TfidfVectorizer,
    rows: RowTable,
    matrix: Vec<SparseVector>,
    built_at: DateTime<Utc>,
}

impl LexicalIndex {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn vocab_size(&self) -> usize {
        self.vectorizer.vocab_size()
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn rows(&self) -> &RowTable {
        &self.rows
    }

    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }

    /// Maps lexical text into this index's vocabulary.
    pub fn project(&self, lexical_text: &str) -> SparseVector {
        self.vectorizer.transform(lexical_text)
    }

    /// Cosine of `query` against every row, row-aligned.
    pub fn scores(&self, query: &SparseVector) -> Vec<f32> {
        self.matrix.iter().map(|row| query.cosine(row)).collect()
    }

    pub fn row_similarity(&self, a: usize, b: usize) -> Option<f32> {
        Some(self.matrix.get(a)?.cosine(self.matrix.get(b)?))
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.rows.row_of(path).is_some()
    }

    /// Structural checks for an index read back from storage.
    pub fn validate(&self) -> Result<(), String> {
        if self.matrix.len() != self.rows.len() {
            return Err(format!("{} rows for {} paths", self.matrix.len(), self.rows.len()));
        }
        let vocab = self.vocab_size();
        if let Some(bad) = self.matrix.iter().position(|r| r.max_index().is_some_and(|i| i as usize >= vocab)) {
            return Err(format!("row {} references a term outside the {}-term vocabulary", bad, vocab));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct LexicalIndexBuilder {
    config: TfidfConfig,
}

impl LexicalIndexBuilder {
    pub fn new(config: TfidfConfig) -> Self {
        Self { config }
    }

    /// Fits a fresh index over the records that have lexical text.
    ///
    /// Returns `None` when nothing can be indexed: no such records, df bounds
    /// that cannot hold for this corpus size, or an empty pruned vocabulary.
    #[instrument(skip_all, fields(records = records.len()))]
    pub fn build(&self, records: &[&DocumentRecord]) -> Option<LexicalIndex> {
        let usable: Vec<&DocumentRecord> = records.iter().copied().filter(|r| !r.lexical_text.is_empty()).collect();
        if usable.is_empty() {
            warn!("no documents with lexical text; lexical index not built");
            return None;
        }
        let texts: Vec<&str> = usable.iter().map(|r| r.lexical_text.as_str()).collect();
        let (vectorizer, matrix) = match TfidfVectorizer::fit_transform(&texts, &self.config) {
            Ok(fitted) => fitted,
            Err(e) => {
                warn!(documents = usable.len(), "lexical index not built: {}", e);
                return None;
            }
        };
        let entries = usable
            .iter()
            .map(|r| RowEntry { path: r.path.clone(), content_hash: r.content_hash.clone() })
            .collect();
        let rows = match RowTable::new(entries) {
            Ok(rows) => rows,
            Err(e) => {
                warn!("lexical index not built: {}", e);
                return None;
            }
        };
        let index = LexicalIndex { vectorizer, rows, matrix, built_at: Utc::now() };
        info!(documents = index.len(), vocab_size = index.vocab_size(), "lexical index built");
        Some(index)
    }
}

/// Similarity of two lexical texts through a throwaway two-row index.
///
/// `None` when the two texts share no indexable term at all.
pub fn pairwise_similarity(a: &str, b: &str) -> Option<f32> {
    let (_, rows) = TfidfVectorizer::fit_transform(&[a, b], &TfidfConfig::pairwise()).ok()?;
    Some(rows[0].cosine(&rows[1]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn record(path: &str, lexical: &str) -> DocumentRecord {
        DocumentRecord {
            path: PathBuf::from(path),
            content_hash: format!("hash-{}", path),
            file_size: lexical.len(),
            main_content_length: lexical.len(),
            lexical_text: lexical.to_string(),
            lexical_word_count: lexical.split_whitespace().count(),
            semantic_text: lexical.to_string(),
            semantic_word_count: lexical.split_whitespace().count(),
            processed_at: Utc::now(),
        }
    }

    fn loose() -> LexicalIndexBuilder {
        LexicalIndexBuilder::new(TfidfConfig { ngram_range: (1, 2), max_features: None, min_df: 1, max_df: 1.0 })
    }

    #[test]
    fn rows_align_with_paths_and_skip_empty_text() {
        let docs = [record("/a", "stock rise"), record("/b", ""), record("/c", "bond fall")];
        let refs: Vec<&DocumentRecord> = docs.iter().collect();
        let index = loose().build(&refs).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.rows().row_of(Path::new("/c")), Some(1));
        assert!(!index.contains(Path::new("/b")));
        index.validate().unwrap();
    }

    #[test]
    fn each_row_is_most_similar_to_itself() {
        let docs = [record("/a", "stock rise earn"), record("/b", "stock fall loss"), record("/c", "bond yield rise")];
        let refs: Vec<&DocumentRecord> = docs.iter().collect();
        let index = loose().build(&refs).unwrap();
        for (i, doc) in docs.iter().enumerate() {
            let scores = index.scores(&index.project(&doc.lexical_text));
            assert!((scores[i] - 1.0).abs() < 1e-5, "row {} self-similarity {}", i, scores[i]);
        }
    }

    #[test]
    fn nothing_to_index_is_none() {
        let docs = [record("/a", ""), record("/b", "")];
        let refs: Vec<&DocumentRecord> = docs.iter().collect();
        assert!(loose().build(&refs).is_none());
        assert!(LexicalIndexBuilder::default().build(&[]).is_none());
    }

    #[test]
    fn default_bounds_on_tiny_corpus_is_none() {
        let docs = [record("/a", "stock rise")];
        let refs: Vec<&DocumentRecord> = docs.iter().collect();
        assert!(LexicalIndexBuilder::default().build(&refs).is_none());
    }

    #[test]
    fn pairwise_identical_texts_score_one() {
        let s = pairwise_similarity("compani report strong quarter earn growth", "compani report strong quarter earn growth").unwrap();
        assert!((s - 1.0).abs() < 1e-5);
        assert!(pairwise_similarity("", "").is_none());
        assert_eq!(pairwise_similarity("stock", "bond"), Some(0.0));
    }

    #[test]
    fn misaligned_index_fails_validation() {
        let docs = [record("/a", "stock rise"), record("/b", "bond rise")];
        let refs: Vec<&DocumentRecord> = docs.iter().collect();
        let mut index = loose().build(&refs).unwrap();
        index.matrix.pop();
        assert!(index.validate().is_err());
    }
}
