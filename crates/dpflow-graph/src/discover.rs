//! Repository discovery
//!
//! Recursive walk that yields the source files the extractors understand.
//! Hidden files and directories are skipped, as are paths matching the
//! config's `exclude` rules.

use dpflow_core::{Dialect, ExcludeRules};
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

/// All candidate source files under `root`, sorted by path
pub fn discover_sources(root: &Path, exclude: &ExcludeRules) -> Vec<PathBuf> {
    let mut sources = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };

        if !entry.file_type().is_file() || Dialect::from_path(entry.path()).is_none() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");

        if exclude.is_excluded(&relative) {
            continue;
        }

        sources.push(entry.into_path());
    }

    sources
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}
