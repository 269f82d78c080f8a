//! Snapshot files stored alongside the audited tree

use crate::snapshot::{Snapshot, SnapshotId};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory holding `<identity>.sha256` snapshot files
#[derive(Debug, Clone)]
pub struct SnapshotRepository {
    dir: PathBuf,
}

impl SnapshotRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_of(&self, identity: &SnapshotId) -> PathBuf {
        self.dir.join(identity.file_name())
    }

    /// All snapshot identities in the directory, oldest first.
    ///
    /// Only regular files named exactly `<14 digits>.sha256` count; diff
    /// result files and anything else are ignored.
    pub fn list_snapshots(&self) -> Result<Vec<SnapshotId>> {
        let mut identities: Vec<SnapshotId> = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read snapshot directory: {}", self.dir.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| SnapshotId::from_file_name(&entry.file_name().to_string_lossy()))
            .collect();

        identities.sort();
        Ok(identities)
    }

    /// Load and parse a snapshot. A malformed line fails the whole load.
    pub fn load(&self, identity: &SnapshotId) -> Result<Snapshot> {
        let path = self.path_of(identity);
        let snapshot = load_snapshot_file(&path)?;
        Ok(snapshot.with_identity(identity.clone()))
    }

    /// Write `snapshot` as `<identity>.sha256`, replacing any file of that name
    pub fn save(&self, identity: &SnapshotId, snapshot: &Snapshot) -> Result<PathBuf> {
        let path = self.path_of(identity);
        fs::write(&path, snapshot.to_text())
            .with_context(|| format!("Failed to write snapshot: {}", path.display()))?;
        Ok(path)
    }
}

/// Read and parse any file in the snapshot line format
pub fn load_snapshot_file(path: &Path) -> Result<Snapshot> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot file: {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let snapshot = Snapshot::parse(&content, &name)
        .with_context(|| format!("Failed to parse snapshot file: {}", path.display()))?;
    Ok(snapshot)
}

/// The identity immediately before `current` in ascending `identities`.
///
/// `None` when `current` is the oldest or is not in the list at all; either way
/// there is no baseline to compare against.
pub fn find_previous<'a>(identities: &'a [SnapshotId], current: &SnapshotId) -> Option<&'a SnapshotId> {
    let position = identities.iter().position(|id| id == current)?;
    position.checked_sub(1).map(|i| &identities[i])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::hash_bytes;
    use crate::snapshot::HashState;
    use tempfile::TempDir;

    fn id(raw: &str) -> SnapshotId {
        SnapshotId::parse(raw).unwrap()
    }

    #[test]
    fn test_list_snapshots_filters_and_sorts() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        for name in [
            "20240301000000.sha256",
            "20240101000000.sha256",
            "20240201000000.sha256",
            "20240201000000.added.sha256",
            "2024020100000.sha256",
            "notes.sha256",
            "20240401000000.txt",
            "sha256report.tmp",
        ] {
            fs::write(dir.join(name), "").unwrap();
        }
        fs::create_dir(dir.join("20240501000000.sha256")).unwrap();

        let repo = SnapshotRepository::new(dir);
        let ids = repo.list_snapshots().unwrap();

        assert_eq!(
            ids,
            vec![id("20240101000000"), id("20240201000000"), id("20240301000000")]
        );
    }

    #[test]
    fn test_round_trip_hello_world() {
        let temp_dir = TempDir::new().unwrap();
        let repo = SnapshotRepository::new(temp_dir.path());
        let hello = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
        let world = "486ea46224d1bb4fb680f34f7c9ad96a8f24ec88be73ea8e5a6c65260e9cb8a7";
        assert_eq!(hash_bytes(b"hello"), hello);
        assert_eq!(hash_bytes(b"world"), world);

        let mut snapshot = Snapshot::new();
        snapshot.insert("x.txt", HashState::Computed(hello.to_string()));
        snapshot.insert("y.txt", HashState::Computed(world.to_string()));

        let identity = id("20240102030405");
        let path = repo.save(&identity, &snapshot).unwrap();
        assert_eq!(path, temp_dir.path().join("20240102030405.sha256"));

        let loaded = repo.load(&identity).unwrap();
        assert_eq!(loaded.identity, Some(identity));
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get("x.txt").and_then(HashState::hash), Some(hello));
        assert_eq!(loaded.get("y.txt").and_then(HashState::hash), Some(world));
    }

    #[test]
    fn test_load_malformed_is_error() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("20240101000000.sha256"), "no separator here").unwrap();

        let repo = SnapshotRepository::new(temp_dir.path());
        assert!(repo.load(&id("20240101000000")).is_err());
    }

    #[test]
    fn test_find_previous() {
        let ids = vec![id("20240101000000"), id("20240201000000"), id("20240301000000")];

        assert_eq!(find_previous(&ids, &id("20240301000000")), Some(&ids[1]));
        assert_eq!(find_previous(&ids, &id("20240201000000")), Some(&ids[0]));
        assert_eq!(find_previous(&ids, &id("20240101000000")), None);
        assert_eq!(find_previous(&ids, &id("20240401000000")), None);
    }
}
