//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge built-in defaults, `config.toml`, `config.<env>.toml`
//! and `APP_*` env vars (nested keys separated by `__`, e.g.
//! `APP_LEXICAL__MIN_DF=1`). Provides helpers to expand `~` and `${VAR}` and to
//! resolve relative paths against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub dir: String,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { dir: "vector_cache".to_string() }
    }
}

/// TF-IDF weighting parameters for the corpus index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexicalSettings {
    /// Vocabulary cap, most frequent terms across the corpus first.
    pub max_features: Option<usize>,
    /// Minimum number of documents a term must appear in.
    pub min_df: usize,
    /// Maximum fraction of documents a term may appear in.
    pub max_df: f32,
    pub ngram_min: usize,
    pub ngram_max: usize,
}

impl Default for LexicalSettings {
    fn default() -> Self {
        Self { max_features: Some(10_000), min_df: 2, max_df: 0.95, ngram_min: 1, ngram_max: 2 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticSettings {
    pub enabled: bool,
    pub batch_size: usize,
    pub dim: usize,
}

impl Default for SemanticSettings {
    fn default() -> Self {
        Self { enabled: true, batch_size: 32, dim: 384 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySettings {
    pub top_k: usize,
    pub duplicate_threshold: f32,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self { top_k: 5, duplicate_threshold: 0.8 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub cache: CacheSettings,
    pub lexical: LexicalSettings,
    pub semantic: SemanticSettings,
    pub query: QuerySettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let lex = &self.lexical;
        if lex.ngram_min == 0 || lex.ngram_min > lex.ngram_max {
            return Err(Error::InvalidConfig(format!("ngram span ({}, {}) is invalid", lex.ngram_min, lex.ngram_max)));
        }
        if !(lex.max_df > 0.0 && lex.max_df <= 1.0) {
            return Err(Error::InvalidConfig(format!("lexical.max_df must be in (0, 1], got {}", lex.max_df)));
        }
        if lex.max_features == Some(0) {
            return Err(Error::InvalidConfig("lexical.max_features must be positive".into()));
        }
        if self.semantic.batch_size == 0 {
            return Err(Error::InvalidConfig("semantic.batch_size must be positive".into()));
        }
        if self.semantic.dim == 0 {
            return Err(Error::InvalidConfig("semantic.dim must be positive".into()));
        }
        Ok(())
    }

    pub fn cache_dir(&self) -> PathBuf {
        expand_path(&self.cache.dir)
    }
}

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment })
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self.figment.extract().map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
