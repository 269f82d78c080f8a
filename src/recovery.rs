//! Recovery file for resuming an interrupted hashing pass
//!
//! The recovery file holds the entries processed so far in the snapshot line
//! format. It is only meaningful if the tree has not changed since it was
//! written; that is assumed, and `merge` reports how many recovered paths no
//! longer exist so the caller can warn about it.

use crate::repository::load_snapshot_file;
use crate::snapshot::{render_lines, HashState, Snapshot};
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Default file name of the recovery file in the scan root
pub const RECOVERY_FILE_NAME: &str = "sha256report.tmp";

/// Result of merging a recovery file into a fresh walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Pending paths that took a hash from the recovery file
    pub adopted: usize,
    /// Recovered paths that the current walk did not find
    pub stale: usize,
}

/// Write-ahead log of partial results, committed on a wall-clock interval
#[derive(Debug)]
pub struct RecoveryLog {
    path: PathBuf,
    interval: Duration,
    last_commit: Instant,
}

impl RecoveryLog {
    pub fn new(path: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            path: path.into(),
            interval,
            last_commit: Instant::now(),
        }
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Parse the recovery file, or `None` if there is none
    pub fn load(&self) -> Result<Option<Snapshot>> {
        if !self.exists() {
            return Ok(None);
        }
        load_snapshot_file(&self.path)
            .with_context(|| format!("Failed to load recovery file: {}", self.path.display()))
            .map(Some)
    }

    /// Adopt recovered hashes for every pending path in `current`.
    ///
    /// Already-known hashes, paths missing from the recovery file, and
    /// recovered read errors are left untouched so they get hashed again.
    pub fn merge(current: &mut Snapshot, recovered: &Snapshot) -> MergeStats {
        let mut stats = MergeStats::default();

        let adoptable: Vec<(String, String)> = current
            .iter()
            .filter(|(_, state)| state.is_pending())
            .filter_map(|(path, _)| {
                recovered
                    .get(path)
                    .and_then(HashState::hash)
                    .map(|hash| (path.to_string(), hash.to_string()))
            })
            .collect();

        for (path, hash) in adoptable {
            current.insert(path, HashState::Computed(hash));
            stats.adopted += 1;
        }

        stats.stale = recovered.paths().filter(|p| !current.contains(p)).count();
        stats
    }

    /// Overwrite the recovery file if the commit interval has elapsed.
    ///
    /// Returns whether a commit happened. Checked once per processed file, so
    /// the real period can exceed the interval by one file's hashing time.
    pub fn maybe_commit<'a, I>(&mut self, processed: I) -> Result<bool>
    where
        I: IntoIterator<Item = (&'a str, &'a HashState)>,
    {
        if self.last_commit.elapsed() <= self.interval {
            return Ok(false);
        }
        self.commit(processed)?;
        Ok(true)
    }

    /// Overwrite the recovery file now and restart the interval
    pub fn commit<'a, I>(&mut self, processed: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, &'a HashState)>,
    {
        fs::write(&self.path, render_lines(processed))
            .with_context(|| format!("Failed to write recovery file: {}", self.path.display()))?;
        self.last_commit = Instant::now();
        Ok(())
    }

    /// Delete the recovery file if it exists
    pub fn remove(&self) -> Result<()> {
        if self.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove recovery file: {}", self.path.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HASH_A: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
    const HASH_B: &str = "486ea46224d1bb4fb680f34f7c9ad96a8f24ec88be73ea8e5a6c65260e9cb8a7";

    fn pending(paths: &[&str]) -> Snapshot {
        let mut snapshot = Snapshot::new();
        for path in paths {
            snapshot.insert(*path, HashState::Pending);
        }
        snapshot
    }

    #[test]
    fn test_merge_adopts_known_paths_only() {
        let mut recovered = Snapshot::new();
        recovered.insert("a", HashState::Computed(HASH_A.to_string()));
        recovered.insert("b", HashState::Computed(HASH_B.to_string()));

        let mut current = pending(&["a", "b", "c"]);
        let stats = RecoveryLog::merge(&mut current, &recovered);

        assert_eq!(stats, MergeStats { adopted: 2, stale: 0 });
        assert_eq!(current.get("a"), Some(&HashState::Computed(HASH_A.to_string())));
        assert_eq!(current.get("b"), Some(&HashState::Computed(HASH_B.to_string())));
        assert_eq!(current.get("c"), Some(&HashState::Pending));
    }

    #[test]
    fn test_merge_leaves_read_errors_and_counts_stale() {
        let mut recovered = Snapshot::new();
        recovered.insert("locked", HashState::ReadError);
        recovered.insert("gone", HashState::Computed(HASH_A.to_string()));

        let mut current = pending(&["locked"]);
        let stats = RecoveryLog::merge(&mut current, &recovered);

        assert_eq!(stats, MergeStats { adopted: 0, stale: 1 });
        assert_eq!(current.get("locked"), Some(&HashState::Pending));
    }

    #[test]
    fn test_merge_keeps_existing_hash() {
        let mut recovered = Snapshot::new();
        recovered.insert("a", HashState::Computed(HASH_B.to_string()));

        let mut current = Snapshot::new();
        current.insert("a", HashState::Computed(HASH_A.to_string()));
        let stats = RecoveryLog::merge(&mut current, &recovered);

        assert_eq!(stats.adopted, 0);
        assert_eq!(current.get("a").and_then(HashState::hash), Some(HASH_A));
    }

    #[test]
    fn test_commit_load_remove() {
        let temp_dir = TempDir::new().unwrap();
        let mut log = RecoveryLog::new(temp_dir.path().join(RECOVERY_FILE_NAME), Duration::ZERO);
        assert!(log.load().unwrap().is_none());

        let a = HashState::Computed(HASH_A.to_string());
        let err = HashState::ReadError;
        log.commit([("a", &a), ("locked", &err)]).unwrap();

        let loaded = log.load().unwrap().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get("locked"), Some(&HashState::ReadError));

        // each commit overwrites the previous one
        log.commit([("a", &a)]).unwrap();
        assert_eq!(log.load().unwrap().unwrap().len(), 1);

        log.remove().unwrap();
        assert!(!log.exists());
        log.remove().unwrap();
    }

    #[test]
    fn test_maybe_commit_respects_interval() {
        let temp_dir = TempDir::new().unwrap();
        let a = HashState::Computed(HASH_A.to_string());

        let mut slow = RecoveryLog::new(temp_dir.path().join("slow.tmp"), Duration::from_secs(3600));
        assert!(!slow.maybe_commit([("a", &a)]).unwrap());
        assert!(!slow.exists());

        let mut eager = RecoveryLog::new(temp_dir.path().join("eager.tmp"), Duration::ZERO);
        std::thread::sleep(Duration::from_millis(5));
        assert!(eager.maybe_commit([("a", &a)]).unwrap());
        assert!(eager.exists());
    }

    #[test]
    fn test_malformed_recovery_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(RECOVERY_FILE_NAME);
        fs::write(&path, "garbage").unwrap();

        let log = RecoveryLog::new(path, Duration::ZERO);
        assert!(log.load().is_err());
    }
}
