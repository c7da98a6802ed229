use std::path::PathBuf;

use thiserror::Error;

use crate::types::Representation;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to read {}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },

    #[error("No documents with usable text")]
    EmptyCorpus,

    #[error("No {0} index has been built")]
    NotIndexed(Representation),

    #[error("Cache artifact '{artifact}' is corrupt: {reason}")]
    CacheCorrupt { artifact: String, reason: String },

    #[error("No semantic encoder is configured")]
    NoEncoder,

    #[error("Semantic index was built with '{index}' but the encoder is '{encoder}'")]
    ModelMismatch { index: String, encoder: String },

    #[error("Encoding failed: {0}")]
    Encoding(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn read(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Read { path: path.into(), reason: reason.to_string() }
    }

    pub fn corrupt(artifact: &str, reason: impl ToString) -> Self {
        Self::CacheCorrupt { artifact: artifact.to_string(), reason: reason.to_string() }
    }

    /// The requested representation cannot be answered right now.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::NotIndexed(_) | Self::NoEncoder | Self::ModelMismatch { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
