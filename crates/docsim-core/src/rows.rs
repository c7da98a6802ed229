//! Row table shared by both index kinds.
//!
//! Row `i` of an index matrix belongs to `entries[i]`. The path lookup map is
//! derived from the entries and rebuilt on deserialization, so it can never
//! drift from the ordered list.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowEntry {
    pub path: PathBuf,
    /// Content hash of the document when its row was computed.
    pub content_hash: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<RowEntry>", into = "Vec<RowEntry>")]
pub struct RowTable {
    entries: Vec<RowEntry>,
    lookup: HashMap<PathBuf, usize>,
}

impl RowTable {
    pub fn new(entries: Vec<RowEntry>) -> Result<Self, String> {
        let mut lookup = HashMap::with_capacity(entries.len());
        for (row, entry) in entries.iter().enumerate() {
            if lookup.insert(entry.path.clone(), row).is_some() {
                return Err(format!("duplicate path in row table: {}", entry.path.display()));
            }
        }
        Ok(Self { entries, lookup })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn row_of(&self, path: &Path) -> Option<usize> {
        self.lookup.get(path).copied()
    }

    pub fn entry(&self, row: usize) -> Option<&RowEntry> {
        self.entries.get(row)
    }

    /// Row of `path` only if it was computed from content with `hash`.
    pub fn current_row(&self, path: &Path, hash: &str) -> Option<usize> {
        self.row_of(path).filter(|&row| self.entries[row].content_hash == hash)
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(|e| e.path.as_path())
    }

    pub fn entries(&self) -> &[RowEntry] {
        &self.entries
    }
}

impl PartialEq for RowTable {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl TryFrom<Vec<RowEntry>> for RowTable {
    type Error = String;

    fn try_from(entries: Vec<RowEntry>) -> Result<Self, Self::Error> {
        Self::new(entries)
    }
}

impl From<RowTable> for Vec<RowEntry> {
    fn from(table: RowTable) -> Self {
        table.entries
    }
}
