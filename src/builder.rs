//! Resumable snapshot builder
//!
//! Runs Scanning → Merging Recovery → Hashing → Finalizing → Done for one tree.
//! Everything happens on the calling thread; the recovery file exists for
//! resuming in a later process, not for sharing within this one.

use crate::build_events::{BuildEvent, BuildEventCallback, BuildPhase};
use crate::checksum;
use crate::progress::Progress;
use crate::recovery::{MergeStats, RecoveryLog, RECOVERY_FILE_NAME};
use crate::repository::SnapshotRepository;
use crate::scanner::{self, FileEntry, SkipRules};
use crate::size::DEFAULT_BLOCK_SIZE;
use crate::snapshot::{HashState, Snapshot, SnapshotId};
use anyhow::Result;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

/// Produces the identity for a finished snapshot
pub type IdentityClock = Box<dyn FnMut() -> SnapshotId>;

/// Fixed settings for one build
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub block_size: u64,
    pub commit_interval: Duration,
    pub skip_rules: SkipRules,
    pub recovery_file_name: String,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            commit_interval: Duration::from_secs(20),
            skip_rules: SkipRules::new([".tisk", RECOVERY_FILE_NAME]),
            recovery_file_name: RECOVERY_FILE_NAME.to_string(),
        }
    }
}

/// What a finished build hands over to the diff stage
#[derive(Debug)]
pub struct BuildOutcome {
    pub identity: SnapshotId,
    pub snapshot: Snapshot,
    pub snapshot_path: PathBuf,
    /// Paths that failed to read during this pass only
    pub errors: BTreeSet<String>,
    pub recovery: Option<MergeStats>,
    pub progress: Progress,
}

pub struct SnapshotBuilder {
    root: PathBuf,
    options: BuildOptions,
    progress: Progress,
    on_event: Option<BuildEventCallback>,
    clock: IdentityClock,
}

impl SnapshotBuilder {
    pub fn new(root: impl Into<PathBuf>, options: BuildOptions) -> Self {
        Self {
            root: root.into(),
            options,
            progress: Progress::new(),
            on_event: None,
            clock: Box::new(SnapshotId::now),
        }
    }

    /// Use `progress` (typically carrying a bar callback) for this build
    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_events(mut self, callback: BuildEventCallback) -> Self {
        self.on_event = Some(callback);
        self
    }

    /// Replace the wall clock used to name the snapshot
    pub fn with_clock(mut self, clock: IdentityClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn recovery_path(&self) -> PathBuf {
        self.root.join(&self.options.recovery_file_name)
    }

    /// Run all phases and write the snapshot into the root directory
    pub fn build(mut self) -> Result<BuildOutcome> {
        self.enter(BuildPhase::Scanning);
        let entries = self.scan()?;
        let mut snapshot = Snapshot::new();
        for entry in &entries {
            snapshot.insert(entry.path.clone(), HashState::Pending);
        }

        self.enter(BuildPhase::MergingRecovery);
        let mut log = RecoveryLog::new(self.recovery_path(), self.options.commit_interval);
        let recovery = self.merge_recovery(&log, &mut snapshot)?;

        self.enter(BuildPhase::Hashing);
        let errors = self.hash_all(&entries, &mut snapshot, &mut log)?;

        self.enter(BuildPhase::Finalizing);
        // named after completion, not start
        let identity = (self.clock)();
        let repository = SnapshotRepository::new(&self.root);
        let snapshot_path = repository.save(&identity, &snapshot)?;
        log.remove()?;
        self.emit(BuildEvent::SnapshotWritten {
            identity: identity.to_string(),
            path: snapshot_path.clone(),
        });

        self.enter(BuildPhase::Done);
        Ok(BuildOutcome {
            snapshot: snapshot.with_identity(identity.clone()),
            identity,
            snapshot_path,
            errors,
            recovery,
            progress: self.progress,
        })
    }

    fn scan(&mut self) -> Result<Vec<FileEntry>> {
        self.emit(BuildEvent::ScanStarted {
            root: self.root.clone(),
        });
        let entries = scanner::scan_tree(
            &self.root,
            &self.options.skip_rules,
            self.options.block_size,
            &mut self.progress,
        )?;
        self.emit(BuildEvent::ScanFinished {
            files: self.progress.files_count,
            dirs: self.progress.dirs_count,
            total_blocks: self.progress.total_blocks,
            total_bytes: self.progress.total_bytes,
        });
        Ok(entries)
    }

    fn merge_recovery(&mut self, log: &RecoveryLog, snapshot: &mut Snapshot) -> Result<Option<MergeStats>> {
        let Some(recovered) = log.load()? else {
            return Ok(None);
        };
        let stats = RecoveryLog::merge(snapshot, &recovered);
        self.emit(BuildEvent::RecoveryMerged {
            adopted: stats.adopted,
            stale: stats.stale,
        });
        Ok(Some(stats))
    }

    fn hash_all(
        &mut self,
        entries: &[FileEntry],
        snapshot: &mut Snapshot,
        log: &mut RecoveryLog,
    ) -> Result<BTreeSet<String>> {
        let mut errors = BTreeSet::new();

        for (i, entry) in entries.iter().enumerate() {
            let known = snapshot
                .get(&entry.path)
                .and_then(HashState::hash)
                .map(str::to_owned);

            let done_before = self.progress.done_blocks;
            let state = match checksum::compute_hash(
                &entry.source,
                entry.size_blocks,
                self.options.block_size,
                &mut self.progress,
                known.as_deref(),
            ) {
                Ok(hash) => HashState::Computed(hash),
                Err(e) => {
                    // count the unread remainder so done_blocks still reaches total_blocks
                    let advanced = self.progress.done_blocks - done_before;
                    self.progress.advance(entry.size_blocks.saturating_sub(advanced));
                    self.emit(BuildEvent::ReadFailed {
                        path: entry.path.clone(),
                        error: e.to_string(),
                    });
                    errors.insert(entry.path.clone());
                    HashState::ReadError
                }
            };
            snapshot.insert(entry.path.clone(), state);

            if log.maybe_commit(snapshot.iter().take(i + 1))? {
                self.emit(BuildEvent::RecoveryCommitted { entries: i + 1 });
            }
        }

        Ok(errors)
    }

    fn enter(&mut self, phase: BuildPhase) {
        self.emit(BuildEvent::Phase(phase));
    }

    fn emit(&mut self, event: BuildEvent) {
        if let Some(callback) = self.on_event.as_mut() {
            callback(&event);
        }
    }
}
