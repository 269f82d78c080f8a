//! Events emitted while a snapshot is being built (used by the CLI reporter)

use std::path::PathBuf;

/// Snapshot builder phases, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    Scanning,
    MergingRecovery,
    Hashing,
    Finalizing,
    Done,
}

/// Callback receiving build events
pub type BuildEventCallback = Box<dyn FnMut(&BuildEvent)>;

/// Milestones and per-file problems during one snapshot build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    /// The builder moved to a new phase.
    Phase(BuildPhase),

    /// The tree walk has started.
    ScanStarted { root: PathBuf },

    /// The tree walk has finished and totals are known.
    ScanFinished {
        files: u64,
        dirs: u64,
        total_blocks: u64,
        total_bytes: u64,
    },

    /// A recovery file from an interrupted run was merged.
    RecoveryMerged { adopted: usize, stale: usize },

    /// One file could not be read; the run continues.
    ReadFailed { path: String, error: String },

    /// Partial results were written to the recovery file.
    RecoveryCommitted { entries: usize },

    /// The final snapshot file was written.
    SnapshotWritten { identity: String, path: PathBuf },
}
