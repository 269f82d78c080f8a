//! Tree walker collecting the regular files to hash

use crate::progress::Progress;
use crate::size;
use crate::snapshot::SNAPSHOT_SUFFIX;
use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// A regular file discovered under the scan root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Snapshot key: path relative to the scan root, `/`-separated.
    /// Lossy for names that are not valid UTF-8.
    pub path: String,
    /// Location as returned by the walk; always opens the real file
    pub source: PathBuf,
    pub byte_size: u64,
    pub size_blocks: u64,
}

/// Names skipped directly under the scan root.
///
/// Only the root level is filtered; a nested directory called `.tisk` is
/// still walked and its files included.
#[derive(Debug, Clone)]
pub struct SkipRules {
    names: Vec<String>,
}

impl SkipRules {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .map(|name| name.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Whether a root-level entry named `name` is excluded from the walk
    pub fn skips(&self, name: &str, is_file: bool) -> bool {
        let lower = name.to_lowercase();
        if self.names.iter().any(|n| *n == lower) {
            return true;
        }
        is_file && name.ends_with(SNAPSHOT_SUFFIX)
    }

    fn skips_entry(&self, entry: &DirEntry) -> bool {
        if entry.depth() != 1 {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        self.skips(&name, entry.file_type().is_file())
    }
}

/// Walk `root` in pre-order and collect every regular file.
///
/// Children come back in directory-listing order, which is not sorted. File
/// and directory counts plus the block total are added to `progress`. Any
/// directory that cannot be listed aborts the walk.
pub fn scan_tree(
    root: &Path,
    rules: &SkipRules,
    block_size: u64,
    progress: &mut Progress,
) -> Result<Vec<FileEntry>> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| !rules.skips_entry(entry));

    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        let file_type = entry.file_type();

        if file_type.is_dir() {
            progress.add_dir();
            continue;
        }
        if !file_type.is_file() {
            // sockets, fifos, device nodes
            continue;
        }

        let metadata = entry
            .metadata()
            .with_context(|| format!("Failed to read metadata: {}", entry.path().display()))?;
        let byte_size = metadata.len();
        let size_blocks = size::block_count(byte_size, block_size);
        progress.add_file(byte_size, size_blocks);

        files.push(FileEntry {
            path: relative_path(entry.path(), root),
            source: entry.into_path(),
            byte_size,
            size_blocks,
        });
    }

    Ok(files)
}

/// Render `path` relative to `base` with `/` separators
pub fn relative_path(path: &Path, base: &Path) -> String {
    let relative = path.strip_prefix(base).unwrap_or(path);
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
