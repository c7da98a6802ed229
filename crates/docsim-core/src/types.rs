//! Domain types shared by the lexical and semantic engines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Processed form of one source document.
///
/// - `path`: absolute path, the record's identity
/// - `content_hash`: BLAKE3 hex digest of the raw bytes the record was built from
/// - `file_size`: raw byte length
/// - `main_content_length`: character count of the body after the preamble
/// - `lexical_text`/`semantic_text`: the two normalized forms
/// - `processed_at`: when the text was last normalized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub path: PathBuf,
    pub content_hash: String,
    pub file_size: usize,
    pub main_content_length: usize,
    pub lexical_text: String,
    pub lexical_word_count: usize,
    pub semantic_text: String,
    pub semantic_word_count: usize,
    pub processed_at: DateTime<Utc>,
}

impl DocumentRecord {
    pub fn text_for(&self, representation: Representation) -> &str {
        match representation {
            Representation::Lexical => &self.lexical_text,
            Representation::Semantic => &self.semantic_text,
        }
    }
}

/// One of the two index spaces.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Representation {
    Lexical,
    Semantic,
}

impl Representation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lexical => "lexical",
            Self::Semantic => "semantic",
        }
    }
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which representations a caller asks for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Lexical,
    Semantic,
    Both,
}

impl Method {
    pub fn representations(self) -> &'static [Representation] {
        match self {
            Self::Lexical => &[Representation::Lexical],
            Self::Semantic => &[Representation::Semantic],
            Self::Both => &[Representation::Lexical, Representation::Semantic],
        }
    }

    pub fn includes(self, representation: Representation) -> bool {
        self.representations().contains(&representation)
    }
}

impl From<Representation> for Method {
    fn from(r: Representation) -> Self {
        match r {
            Representation::Lexical => Self::Lexical,
            Representation::Semantic => Self::Semantic,
        }
    }
}

/// A ranked neighbour of a query document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResultEntry {
    pub path: PathBuf,
    pub similarity: f32,
    pub rank: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexicalResult {
    pub entries: Vec<QueryResultEntry>,
    pub vocab_size: usize,
    /// Share of the query's distinct terms present in the fitted vocabulary.
    pub coverage: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticResult {
    pub entries: Vec<QueryResultEntry>,
    pub model_id: String,
    pub dim: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindSimilarResult {
    pub lexical: Option<LexicalResult>,
    pub semantic: Option<SemanticResult>,
}

/// Where a pairwise score came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreSource {
    /// Read from rows of a built index.
    Index,
    /// Computed on the fly from a two-document index.
    Ephemeral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairSimilarity {
    pub representation: Representation,
    pub score: f32,
    pub source: ScoreSource,
}

/// Coarse reading of a cosine score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimilarityBand {
    VeryHigh,
    High,
    Moderate,
    Low,
    VeryLow,
}

impl SimilarityBand {
    pub fn classify(score: f32) -> Self {
        match score {
            s if s >= 0.8 => Self::VeryHigh,
            s if s >= 0.6 => Self::High,
            s if s >= 0.4 => Self::Moderate,
            s if s >= 0.2 => Self::Low,
            _ => Self::VeryLow,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Self::VeryHigh => "very high similarity, likely duplicate or near-duplicate",
            Self::High => "high similarity, closely related content",
            Self::Moderate => "moderate similarity, somewhat related",
            Self::Low => "low similarity, weakly related",
            Self::VeryLow => "very low similarity, unrelated",
        }
    }
}

pub fn is_duplicate(score: f32, threshold: f32) -> bool {
    score >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_follow_thresholds() {
        assert_eq!(SimilarityBand::classify(0.95), SimilarityBand::VeryHigh);
        assert_eq!(SimilarityBand::classify(0.8), SimilarityBand::VeryHigh);
        assert_eq!(SimilarityBand::classify(0.61), SimilarityBand::High);
        assert_eq!(SimilarityBand::classify(0.4), SimilarityBand::Moderate);
        assert_eq!(SimilarityBand::classify(0.25), SimilarityBand::Low);
        assert_eq!(SimilarityBand::classify(-0.3), SimilarityBand::VeryLow);
        assert!(is_duplicate(0.8, 0.8));
        assert!(!is_duplicate(0.79, 0.8));
    }

    #[test]
    fn both_covers_each_representation() {
        assert!(Method::Both.includes(Representation::Lexical));
        assert!(Method::Both.includes(Representation::Semantic));
        assert!(!Method::Lexical.includes(Representation::Semantic));
        assert_eq!(Method::from(Representation::Semantic), Method::Semantic);
    }
}
