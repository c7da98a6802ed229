//! On-disk cache: one JSON file per artifact.
//!
//! Artifacts load independently. A missing file is `Missing`; one that fails to
//! read, parse or validate is `Corrupt`, logged and treated as absent while
//! the others still load. Writes go to a temp file in the same directory and
//! are renamed into place.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use docsim_core::types::{DocumentRecord, Representation};
use docsim_core::{Error, Result};
use docsim_text::LexicalIndex;
use docsim_vector::SemanticIndex;

pub const DOCUMENTS_FILE: &str = "documents.json";
pub const LEXICAL_FILE: &str = "lexical_index.json";
pub const SEMANTIC_FILE: &str = "semantic_index.json";

pub fn artifact_file(representation: Representation) -> &'static str {
    match representation {
        Representation::Lexical => LEXICAL_FILE,
        Representation::Semantic => SEMANTIC_FILE,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactStatus {
    /// Loaded with this many documents/rows.
    Loaded(usize),
    Missing,
    Corrupt(String),
}

impl fmt::Display for ArtifactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loaded(n) => write!(f, "loaded ({})", n),
            Self::Missing => f.write_str("missing"),
            Self::Corrupt(reason) => write!(f, "corrupt: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub documents: ArtifactStatus,
    pub lexical: ArtifactStatus,
    pub semantic: ArtifactStatus,
}

impl Default for LoadReport {
    fn default() -> Self {
        Self { documents: ArtifactStatus::Missing, lexical: ArtifactStatus::Missing, semantic: ArtifactStatus::Missing }
    }
}

#[derive(Debug, Default)]
pub struct LoadedCache {
    pub documents: Vec<DocumentRecord>,
    pub lexical: Option<LexicalIndex>,
    pub semantic: Option<SemanticIndex>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct SaveReport {
    pub written: Vec<&'static str>,
    /// Artifacts with nothing to write; any file already on disk is left alone.
    pub skipped: Vec<&'static str>,
}

#[derive(Debug, Clone)]
pub struct CacheDir {
    root: PathBuf,
}

impl CacheDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn load(&self) -> (LoadedCache, LoadReport) {
        let (documents, documents_status) = self.load_artifact(DOCUMENTS_FILE, validate_documents, Vec::len);
        let (lexical, lexical_status) = self.load_artifact(LEXICAL_FILE, LexicalIndex::validate, LexicalIndex::len);
        let (semantic, semantic_status) = self.load_artifact(SEMANTIC_FILE, SemanticIndex::validate, SemanticIndex::len);
        let report = LoadReport { documents: documents_status, lexical: lexical_status, semantic: semantic_status };
        info!(
            root = %self.root.display(),
            documents = %report.documents,
            lexical = %report.lexical,
            semantic = %report.semantic,
            "cache loaded"
        );
        (LoadedCache { documents: documents.unwrap_or_default(), lexical, semantic }, report)
    }

    pub fn save(
        &self,
        documents: &[&DocumentRecord],
        lexical: Option<&LexicalIndex>,
        semantic: Option<&SemanticIndex>,
    ) -> Result<SaveReport> {
        fs::create_dir_all(&self.root)?;
        let mut report = SaveReport::default();
        if documents.is_empty() {
            report.skipped.push(DOCUMENTS_FILE);
        } else {
            self.write_atomic(DOCUMENTS_FILE, documents)?;
            report.written.push(DOCUMENTS_FILE);
        }
        match lexical {
            Some(index) if !index.is_empty() => {
                self.write_atomic(LEXICAL_FILE, index)?;
                report.written.push(LEXICAL_FILE);
            }
            _ => report.skipped.push(LEXICAL_FILE),
        }
        match semantic {
            Some(index) if !index.is_empty() => {
                self.write_atomic(SEMANTIC_FILE, index)?;
                report.written.push(SEMANTIC_FILE);
            }
            _ => report.skipped.push(SEMANTIC_FILE),
        }
        info!(root = %self.root.display(), written = ?report.written, "cache saved");
        Ok(report)
    }

    /// Deletes the artifact for `representation`. `false` if there was none.
    pub fn remove(&self, representation: Representation) -> Result<bool> {
        match fs::remove_file(self.artifact_path(artifact_file(representation))) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn load_artifact<T, V, C>(&self, name: &'static str, validate: V, count: C) -> (Option<T>, ArtifactStatus)
    where
        T: DeserializeOwned,
        V: Fn(&T) -> std::result::Result<(), String>,
        C: Fn(&T) -> usize,
    {
        let path = self.artifact_path(name);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return (None, ArtifactStatus::Missing),
            Err(e) => return corrupt(name, e),
        };
        let value: T = match serde_json::from_slice(&bytes) {
            Ok(v) => v,
            Err(e) => return corrupt(name, e),
        };
        if let Err(reason) = validate(&value) {
            return corrupt(name, reason);
        }
        let n = count(&value);
        (Some(value), ArtifactStatus::Loaded(n))
    }

    fn write_atomic<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        let tmp = NamedTempFile::new_in(&self.root)?;
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer(&mut writer, value).map_err(|e| Error::Io(e.into()))?;
        writer.flush()?;
        drop(writer);
        tmp.persist(self.artifact_path(name)).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

fn corrupt<T>(name: &str, reason: impl ToString) -> (Option<T>, ArtifactStatus) {
    let reason = reason.to_string();
    warn!("{}; ignoring it", Error::corrupt(name, &reason));
    (None, ArtifactStatus::Corrupt(reason))
}

#[allow(clippy::ptr_arg)]
fn validate_documents(records: &Vec<DocumentRecord>) -> std::result::Result<(), String> {
    let mut seen = HashSet::with_capacity(records.len());
    for r in records {
        if !seen.insert(r.path.as_path()) {
            return Err(format!("duplicate record for {}", r.path.display()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_dir_reports_everything_missing() {
        let tmp = TempDir::new().unwrap();
        let (loaded, report) = CacheDir::new(tmp.path()).load();
        assert_eq!(report, LoadReport::default());
        assert!(loaded.documents.is_empty());
        assert!(loaded.lexical.is_none() && loaded.semantic.is_none());
    }

    #[test]
    fn unparsable_artifact_is_corrupt_not_fatal() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(DOCUMENTS_FILE), "{not json").unwrap();
        let (_, report) = CacheDir::new(tmp.path()).load();
        assert!(matches!(report.documents, ArtifactStatus::Corrupt(_)));
        assert_eq!(report.lexical, ArtifactStatus::Missing);
    }

    #[test]
    fn nothing_to_save_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let cache = CacheDir::new(tmp.path().join("cache"));
        let report = cache.save(&[], None, None).unwrap();
        assert!(report.written.is_empty());
        assert_eq!(report.skipped.len(), 3);
        assert!(!cache.remove(Representation::Lexical).unwrap());
    }
}
