//! One audit run: build a snapshot (unless skipped), find the baseline, diff,
//! and write the result lists into the scan root.

use crate::build_events::BuildEventCallback;
use crate::builder::{BuildOutcome, IdentityClock, SnapshotBuilder};
use crate::config::Config;
use crate::diff::{self, DiffResult};
use crate::progress::Progress;
use crate::repository::{find_previous, SnapshotRepository};
use crate::snapshot::SnapshotId;
use anyhow::Result;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// How a run ended
#[derive(Debug)]
pub enum AuditOutcome {
    /// Nothing to compare against. Not an error; no diff files are written.
    NoBaseline {
        build: Option<BuildOutcome>,
    },
    Compared(AuditReport),
}

#[derive(Debug)]
pub struct AuditReport {
    /// Shared file name stem of the diff files
    pub stem: SnapshotId,
    /// Snapshot treated as current
    pub current: SnapshotId,
    pub baseline: SnapshotId,
    pub diff: DiffResult,
    /// Diff files actually written (empty sets write nothing)
    pub written: Vec<PathBuf>,
    /// Present when this run hashed the tree
    pub build: Option<BuildOutcome>,
}

pub struct Audit {
    root: PathBuf,
    config: Config,
    progress: Progress,
    on_event: Option<BuildEventCallback>,
    clock: IdentityClock,
}

impl Audit {
    pub fn new(root: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            root: root.into(),
            config,
            progress: Progress::new(),
            on_event: None,
            clock: Box::new(SnapshotId::now),
        }
    }

    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_events(mut self, callback: BuildEventCallback) -> Self {
        self.on_event = Some(callback);
        self
    }

    pub fn with_clock(mut self, clock: IdentityClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn run(self) -> Result<AuditOutcome> {
        self.config.validate()?;
        if self.config.scan.skip_sha_check {
            self.compare_latest()
        } else {
            self.snapshot_and_compare()
        }
    }

    fn snapshot_and_compare(self) -> Result<AuditOutcome> {
        let repository = SnapshotRepository::new(&self.root);

        let mut builder = SnapshotBuilder::new(&self.root, self.config.build_options())
            .with_progress(self.progress)
            .with_clock(self.clock);
        if let Some(callback) = self.on_event {
            builder = builder.with_events(callback);
        }
        let build = builder.build()?;

        let identities = repository.list_snapshots()?;
        let Some(baseline) = find_previous(&identities, &build.identity).cloned() else {
            return Ok(AuditOutcome::NoBaseline { build: Some(build) });
        };

        let old = repository.load(&baseline)?;
        let diff = diff::diff(&build.snapshot, &old, &build.errors);
        let written = diff.write_files(&self.root, build.identity.as_str())?;

        Ok(AuditOutcome::Compared(AuditReport {
            stem: build.identity.clone(),
            current: build.identity.clone(),
            baseline,
            diff,
            written,
            build: Some(build),
        }))
    }

    /// Diff the two newest existing snapshots without touching the tree.
    ///
    /// Errors come from the newest snapshot's read-error entries, since no
    /// hashing pass runs.
    fn compare_latest(mut self) -> Result<AuditOutcome> {
        let repository = SnapshotRepository::new(&self.root);
        let identities = repository.list_snapshots()?;

        let [.., baseline, current] = identities.as_slice() else {
            return Ok(AuditOutcome::NoBaseline { build: None });
        };

        let new = repository.load(current)?;
        let old = repository.load(baseline)?;
        let errors: BTreeSet<String> = new.read_errors().map(str::to_string).collect();

        let diff = diff::diff(&new, &old, &errors);
        let stem = (self.clock)();
        let written = diff.write_files(&self.root, stem.as_str())?;

        Ok(AuditOutcome::Compared(AuditReport {
            stem,
            current: current.clone(),
            baseline: baseline.clone(),
            diff,
            written,
            build: None,
        }))
    }
}
