use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const DEFAULT_PATTERN: &str = "*.txt";

/// Files under `root` whose file name matches `pattern`, sorted.
pub fn list_txt_files(root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(Error::read(root, "not a directory"));
    }
    let matcher = glob::Pattern::new(pattern)
        .map_err(|e| Error::InvalidConfig(format!("bad file pattern '{}': {}", pattern, e)))?;
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
        let name = entry.file_name().to_string_lossy();
        if matcher.matches(&name) { files.push(entry.path().to_path_buf()); }
    }
    files.sort();
    tracing::debug!(root = %root.display(), pattern, count = files.len(), "listed corpus files");
    Ok(files)
}
