//! docsim-text
//!
//! Lexical side of the engine: text normalization, the TF-IDF vectorizer and
//! the lexical index built on it.

pub mod tantivy_utils;
pub mod normalize;
pub mod tfidf;
pub mod index;

pub use index::{pairwise_similarity, LexicalIndex, LexicalIndexBuilder};
pub use normalize::{extract_main_content, word_count, TextNormalizer};
pub use tfidf::{FitError, TfidfConfig, TfidfVectorizer};
