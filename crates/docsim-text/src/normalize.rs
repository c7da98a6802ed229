//! Text normalization for both index spaces.
//!
//! Lexical text is lowercased, stripped to letters, tokenized, filtered and
//! stemmed. Semantic text keeps word order and only loses punctuation and
//! markup, so the encoder sees close to natural prose.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use tantivy::tokenizer::{TextAnalyzer, TokenStream};

use docsim_core::types::Representation;

use crate::tantivy_utils::build_analyzer;

/// Line separating a boilerplate header from the article body.
pub const BODY_MARKER: &str = "--------------------------------------------------------------------------------";

/// Tokens of this length or shorter are dropped from lexical text.
const MIN_TOKEN_LEN: usize = 2;

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("html regex"));
static URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"http[s]?://(?:[a-zA-Z]|[0-9]|[$-_@.&+]|[!*\(\),]|(?:%[0-9a-fA-F][0-9a-fA-F]))+").expect("url regex")
});
static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+@\S+").expect("email regex"));
static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("non-word regex"));
static NON_ALPHA: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z\s]").expect("non-alpha regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Body of a document: text after the last marker line, or everything.
pub fn extract_main_content(raw: &str) -> &str {
    match raw.rfind(BODY_MARKER) {
        Some(idx) => raw[idx + BODY_MARKER.len()..].trim(),
        None => raw,
    }
}

pub struct TextNormalizer {
    analyzer: TextAnalyzer,
    stemmer: Stemmer,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextNormalizer {
    pub fn new() -> Self {
        Self { analyzer: build_analyzer(), stemmer: Stemmer::create(Algorithm::English) }
    }

    pub fn normalize(&self, raw: &str, mode: Representation) -> String {
        let body = strip_markup(extract_main_content(raw));
        match mode {
            Representation::Semantic => collapse_whitespace(&NON_WORD.replace_all(&body, " ")),
            Representation::Lexical => self.lexical(&body),
        }
    }

    fn lexical(&self, body: &str) -> String {
        let lowered = body.to_lowercase();
        let letters = collapse_whitespace(&NON_ALPHA.replace_all(&lowered, " "));
        if letters.is_empty() {
            return letters;
        }

        // token_stream needs &mut; the analyzer clone shares the built pipeline.
        let mut analyzer = self.analyzer.clone();
        let mut stream = analyzer.token_stream(&letters);
        let mut stems = Vec::new();
        while stream.advance() {
            let token = &stream.token().text;
            if token.len() > MIN_TOKEN_LEN {
                stems.push(self.stemmer.stem(token).into_owned());
            }
        }
        stems.join(" ")
    }
}

fn strip_markup(text: &str) -> String {
    let text = HTML_TAG.replace_all(text, "");
    let text = URL.replace_all(&text, "");
    EMAIL.replace_all(&text, "").into_owned()
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
