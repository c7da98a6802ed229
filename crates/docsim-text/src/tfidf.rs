//! TF-IDF weighting service.
//!
//! Fits a vocabulary of word n-grams over a corpus of already-normalized
//! texts and maps any text into that fixed space. Weights are raw term counts
//! times smoothed IDF `ln((1 + n) / (1 + df)) + 1`, rows L2-normalized.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use docsim_core::config::LexicalSettings;
use docsim_core::math::SparseVector;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfConfig {
    pub ngram_range: (usize, usize),
    pub max_features: Option<usize>,
    pub min_df: usize,
    pub max_df: f32,
}

impl TfidfConfig {
    /// Unigrams without document-frequency bounds, for two-document indexes
    /// where any bound would prune everything.
    pub fn pairwise() -> Self {
        Self { ngram_range: (1, 1), max_features: None, min_df: 1, max_df: 1.0 }
    }
}

impl Default for TfidfConfig {
    fn default() -> Self {
        Self::from(&LexicalSettings::default())
    }
}

impl From<&LexicalSettings> for TfidfConfig {
    fn from(s: &LexicalSettings) -> Self {
        Self { ngram_range: (s.ngram_min, s.ngram_max), max_features: s.max_features, min_df: s.min_df, max_df: s.max_df }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum FitError {
    #[error("no documents to fit")]
    NoDocuments,
    #[error("max_df allows at most {max_doc_count:.2} documents, fewer than min_df = {min_df}")]
    InconsistentBounds { max_doc_count: f32, min_df: usize },
    #[error("no terms remain after pruning")]
    EmptyVocabulary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    config: TfidfConfig,
    /// term -> idf, in vocabulary order (term index = position).
    vocabulary: IndexMap<String, f32>,
}

impl TfidfVectorizer {
    pub fn fit_transform(texts: &[&str], config: &TfidfConfig) -> Result<(Self, Vec<SparseVector>), FitError> {
        if texts.is_empty() {
            return Err(FitError::NoDocuments);
        }
        let n_docs = texts.len();
        let counts: Vec<HashMap<String, u32>> = texts.iter().map(|t| count_terms(t, config.ngram_range)).collect();

        let mut df: HashMap<&str, usize> = HashMap::new();
        let mut total: HashMap<&str, u64> = HashMap::new();
        for doc in &counts {
            for (term, &c) in doc {
                *df.entry(term.as_str()).or_default() += 1;
                *total.entry(term.as_str()).or_default() += u64::from(c);
            }
        }

        let max_doc_count = config.max_df * n_docs as f32;
        if max_doc_count < config.min_df as f32 {
            return Err(FitError::InconsistentBounds { max_doc_count, min_df: config.min_df });
        }
        let mut kept: Vec<&str> = df
            .iter()
            .filter(|(_, &d)| d >= config.min_df && d as f32 <= max_doc_count)
            .map(|(t, _)| *t)
            .collect();

        if let Some(cap) = config.max_features {
            if kept.len() > cap {
                kept.sort_unstable_by(|a, b| total[b].cmp(&total[a]).then_with(|| a.cmp(b)));
                kept.truncate(cap);
            }
        }
        if kept.is_empty() {
            return Err(FitError::EmptyVocabulary);
        }
        kept.sort_unstable();

        let n = n_docs as f32;
        let vocabulary: IndexMap<String, f32> = kept
            .into_iter()
            .map(|t| (t.to_string(), ((1.0 + n) / (1.0 + df[t] as f32)).ln() + 1.0))
            .collect();
        let vectorizer = Self { config: config.clone(), vocabulary };
        let rows = counts.iter().map(|c| vectorizer.weigh(c)).collect();
        Ok((vectorizer, rows))
    }

    /// Projects `text` into the fitted space. Unknown terms carry no weight.
    pub fn transform(&self, text: &str) -> SparseVector {
        self.weigh(&count_terms(text, self.config.ngram_range))
    }

    /// Share of the distinct unigrams of `text` that are in the vocabulary;
    /// 0.0 for text without terms.
    pub fn coverage(&self, text: &str) -> f32 {
        let terms: HashSet<&str> = tokens(text).collect();
        if terms.is_empty() {
            return 0.0;
        }
        let known = terms.iter().filter(|t| self.vocabulary.contains_key(**t)).count();
        known as f32 / terms.len() as f32
    }

    pub fn vocab_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn feature_names(&self) -> impl Iterator<Item = &str> {
        self.vocabulary.keys().map(String::as_str)
    }

    pub fn config(&self) -> &TfidfConfig {
        &self.config
    }

    fn weigh(&self, counts: &HashMap<String, u32>) -> SparseVector {
        let pairs = counts
            .iter()
            .filter_map(|(term, &c)| {
                self.vocabulary.get_full(term.as_str()).map(|(idx, _, idf)| (idx as u32, c as f32 * idf))
            })
            .collect();
        let mut v = SparseVector::from_pairs(pairs);
        v.normalize();
        v
    }
}

fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split_whitespace().filter(|t| t.chars().count() >= 2)
}

fn count_terms(text: &str, (lo, hi): (usize, usize)) -> HashMap<String, u32> {
    let toks: Vec<&str> = tokens(text).collect();
    let mut counts = HashMap::new();
    for n in lo.max(1)..=hi {
        if n > toks.len() {
            break;
        }
        for window in toks.windows(n) {
            *counts.entry(window.join(" ")).or_insert(0) += 1;
        }
    }
    counts
}
