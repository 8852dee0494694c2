//! Icon Source Discovery

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::naming::{derive_name, normalize_separators, ICON_EXTENSION};
use crate::pipeline::PipelineError;

/// One vector icon file under the input root. Immutable for the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IconSource {
    /// POSIX-normalized path relative to the input root.
    pub relative_path: String,
    /// Derived icon name, folders kept as namespace.
    pub name: String,
    pub absolute_path: PathBuf,
}

impl IconSource {
    pub fn new(root: &Path, relative_path: &str) -> Self {
        let relative_path = normalize_separators(relative_path);
        Self {
            name: derive_name(&relative_path),
            absolute_path: root.join(&relative_path),
            relative_path,
        }
    }

    pub fn read_markup(&self) -> Result<String, PipelineError> {
        fs::read_to_string(&self.absolute_path).map_err(|e| PipelineError::io(&self.absolute_path, e))
    }

    pub fn read_bytes(&self) -> Result<Vec<u8>, PipelineError> {
        fs::read(&self.absolute_path).map_err(|e| PipelineError::io(&self.absolute_path, e))
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map_or(false, |name| name.starts_with('.'))
}

fn has_icon_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case(ICON_EXTENSION))
}

/// Recursively find `*.svg` files (any case), skipping dot-files and
/// dot-directories. Sorted by relative path.
pub fn discover(root: &Path) -> Result<Vec<IconSource>, PipelineError> {
    let mut sources = vec![];

    let walker = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| !is_hidden(e));

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            PipelineError::Io {
                path,
                source: e.into(),
            }
        })?;

        if !entry.file_type().is_file() || !has_icon_extension(entry.path()) {
            continue;
        }

        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let relative = relative.to_string_lossy();
        sources.push(IconSource::new(root, &relative));
    }

    sources.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    debug!(root = %root.display(), count = sources.len(), "icon sources discovered");
    Ok(sources)
}
