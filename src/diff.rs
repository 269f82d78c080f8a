//! Comparison of two snapshots

use crate::snapshot::{Snapshot, SNAPSHOT_SUFFIX};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Partition of paths between a new snapshot and its baseline.
///
/// `added`, `deleted`, and `changed` never share a path. `errors` only holds
/// read failures of the pass that produced the new snapshot, and those paths
/// are never reported as changed since their content is unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffResult {
    pub added: BTreeSet<String>,
    pub deleted: BTreeSet<String>,
    pub changed: BTreeSet<String>,
    pub errors: BTreeSet<String>,
}

/// Which result file a path list is written to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    Added,
    Deleted,
    Changed,
    Error,
}

impl DiffKind {
    pub const ALL: [DiffKind; 4] = [
        DiffKind::Added,
        DiffKind::Deleted,
        DiffKind::Changed,
        DiffKind::Error,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DiffKind::Added => "added",
            DiffKind::Deleted => "deleted",
            DiffKind::Changed => "changed",
            DiffKind::Error => "error",
        }
    }

    /// `<stem>.<label>.sha256`
    pub fn file_name(&self, stem: &str) -> String {
        format!("{}.{}{}", stem, self.label(), SNAPSHOT_SUFFIX)
    }
}

/// Compare `new` against the baseline `old`.
///
/// A path is changed when its new hash was computed and differs from the old
/// entry, including an old entry that was unreadable. A path unreadable in
/// `new` is never changed. `errors` is taken as given rather than derived from
/// the maps.
pub fn diff(new: &Snapshot, old: &Snapshot, errors: &BTreeSet<String>) -> DiffResult {
    let mut result = DiffResult {
        errors: errors.clone(),
        ..DiffResult::default()
    };

    for (path, new_state) in new.iter() {
        match old.get(path) {
            None => {
                result.added.insert(path.to_string());
            }
            Some(old_state) => {
                // unreadable now: reported through `errors` instead
                let Some(new_hash) = new_state.hash() else {
                    continue;
                };
                if old_state.hash() != Some(new_hash) {
                    result.changed.insert(path.to_string());
                }
            }
        }
    }

    result.deleted = old
        .paths()
        .filter(|path| !new.contains(path))
        .map(str::to_string)
        .collect();

    result
}

impl DiffResult {
    pub fn get(&self, kind: DiffKind) -> &BTreeSet<String> {
        match kind {
            DiffKind::Added => &self.added,
            DiffKind::Deleted => &self.deleted,
            DiffKind::Changed => &self.changed,
            DiffKind::Error => &self.errors,
        }
    }

    pub fn is_clean(&self) -> bool {
        DiffKind::ALL.iter().all(|kind| self.get(*kind).is_empty())
    }

    /// Write each non-empty set as `<stem>.<kind>.sha256` into `dir`.
    ///
    /// Paths are already sorted; lines are `\n`-joined without a trailing
    /// newline. Returns the files written. An empty set writes nothing.
    pub fn write_files(&self, dir: &Path, stem: &str) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for kind in DiffKind::ALL {
            let paths = self.get(kind);
            if paths.is_empty() {
                continue;
            }
            let file = dir.join(kind.file_name(stem));
            let text = paths.iter().map(String::as_str).collect::<Vec<_>>().join("\n");
            fs::write(&file, text)
                .with_context(|| format!("Failed to write {} list: {}", kind.label(), file.display()))?;
            written.push(file);
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::HashState;
    use tempfile::TempDir;

    fn snapshot(entries: &[(&str, &str)]) -> Snapshot {
        let mut snapshot = Snapshot::new();
        for (path, hash) in entries {
            let state = if *hash == "-" {
                HashState::ReadError
            } else {
                HashState::Computed(hash.to_string())
            };
            snapshot.insert(*path, state);
        }
        snapshot
    }

    fn set(paths: &[&str]) -> BTreeSet<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_diff_partitions() {
        let old = snapshot(&[("a", "1"), ("b", "2"), ("same", "3")]);
        let new = snapshot(&[("b", "9"), ("c", "4"), ("same", "3")]);

        let result = diff(&new, &old, &BTreeSet::new());

        assert_eq!(result.added, set(&["c"]));
        assert_eq!(result.deleted, set(&["a"]));
        assert_eq!(result.changed, set(&["b"]));
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_partition_is_disjoint_and_complete() {
        let old = snapshot(&[("a", "1"), ("b", "2"), ("c", "3"), ("d", "4")]);
        let new = snapshot(&[("b", "2"), ("c", "x"), ("e", "5"), ("f", "6")]);
        let result = diff(&new, &old, &BTreeSet::new());

        let unchanged: BTreeSet<String> = new
            .paths()
            .filter(|p| old.contains(p) && !result.changed.contains(*p))
            .map(str::to_string)
            .collect();

        let parts = [&result.added, &result.deleted, &result.changed, &unchanged];
        for (i, a) in parts.iter().enumerate() {
            for b in parts.iter().skip(i + 1) {
                assert!(a.is_disjoint(b));
            }
        }

        let union: BTreeSet<String> = parts.iter().flat_map(|s| s.iter().cloned()).collect();
        let all: BTreeSet<String> = new.paths().chain(old.paths()).map(str::to_string).collect();
        assert_eq!(union, all);
    }

    #[test]
    fn test_swapping_sides_swaps_added_and_deleted() {
        let a = snapshot(&[("x", "1"), ("y", "2"), ("z", "3")]);
        let b = snapshot(&[("y", "2"), ("z", "4"), ("w", "5")]);

        let forward = diff(&a, &b, &BTreeSet::new());
        let backward = diff(&b, &a, &BTreeSet::new());

        assert_eq!(forward.added, backward.deleted);
        assert_eq!(forward.deleted, backward.added);
        assert_eq!(forward.changed, backward.changed);
    }

    #[test]
    fn test_current_read_error_is_not_a_change() {
        let old = snapshot(&[("locked", "1"), ("still_locked", "-")]);
        let new = snapshot(&[("locked", "-"), ("still_locked", "-")]);

        let result = diff(&new, &old, &set(&["locked", "still_locked"]));

        assert!(result.changed.is_empty());
        assert_eq!(result.errors, set(&["locked", "still_locked"]));
    }

    #[test]
    fn test_readable_again_is_a_change() {
        let old = snapshot(&[("was_locked", "-"), ("same", "3")]);
        let new = snapshot(&[("was_locked", "2"), ("same", "3")]);

        let result = diff(&new, &old, &BTreeSet::new());

        assert_eq!(result.changed, set(&["was_locked"]));
        assert!(result.added.is_empty());
        assert!(result.deleted.is_empty());
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_write_files_only_non_empty() {
        let temp_dir = TempDir::new().unwrap();
        let result = DiffResult {
            added: set(&["z/late.txt", "a/early.txt"]),
            errors: set(&["locked.bin"]),
            ..DiffResult::default()
        };

        let written = result.write_files(temp_dir.path(), "20240101000000").unwrap();

        assert_eq!(written.len(), 2);
        let added = fs::read_to_string(temp_dir.path().join("20240101000000.added.sha256")).unwrap();
        assert_eq!(added, "a/early.txt\nz/late.txt");
        let errors = fs::read_to_string(temp_dir.path().join("20240101000000.error.sha256")).unwrap();
        assert_eq!(errors, "locked.bin");
        assert!(!temp_dir.path().join("20240101000000.deleted.sha256").exists());
        assert!(!temp_dir.path().join("20240101000000.changed.sha256").exists());
    }

    #[test]
    fn test_is_clean() {
        assert!(DiffResult::default().is_clean());
        let dirty = DiffResult {
            changed: set(&["a"]),
            ..DiffResult::default()
        };
        assert!(!dirty.is_clean());
    }
}
