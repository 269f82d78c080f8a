//! Human and JSON rendering of build events and audit results

use crate::audit::{AuditOutcome, AuditReport};
use crate::build_events::{BuildEvent, BuildEventCallback, BuildPhase};
use crate::diff::{DiffKind, DiffResult};
use crate::progress;
use crate::snapshot::SnapshotId;
use crate::theme::Theme;
use indicatif::ProgressBar;
use serde::Serialize;

/// Output verbosity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OutputMode {
    Quiet,       // Only errors
    Normal,      // Standard output
    Verbose,     // Read failures and recovery details
    VeryVerbose, // All details including changed paths
}

impl OutputMode {
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            OutputMode::Quiet
        } else if verbose >= 2 {
            OutputMode::VeryVerbose
        } else if verbose == 1 {
            OutputMode::Verbose
        } else {
            OutputMode::Normal
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    version: &'static str,
    timestamp: String,
    status: &'static str,
    current: Option<String>,
    baseline: Option<String>,
    stem: Option<String>,
    files_hashed: Option<u64>,
    counts: JsonCounts,
    #[serde(flatten)]
    diff: Option<&'a DiffResult>,
    written: Vec<String>,
}

#[derive(Serialize, Default)]
struct JsonCounts {
    added: usize,
    deleted: usize,
    changed: usize,
    errors: usize,
}

/// Event printer for a snapshot build.
///
/// Shows a spinner while scanning and routes messages through `bar` so they
/// don't tear the progress line.
pub fn event_printer(mode: OutputMode, bar: ProgressBar) -> BuildEventCallback {
    let mut spinner: Option<ProgressBar> = None;

    Box::new(move |event: &BuildEvent| {
        if mode == OutputMode::Quiet {
            return;
        }
        match event {
            BuildEvent::ScanStarted { root } => {
                spinner = Some(progress::create_spinner(&format!(
                    "Scanning directory tree {}...",
                    root.display()
                )));
            }
            BuildEvent::ScanFinished {
                files,
                dirs,
                total_blocks,
                total_bytes,
            } => {
                if let Some(sp) = spinner.take() {
                    progress::finish_and_clear(&sp);
                }
                println!(
                    "{} {}  {} {}  {} {} blocks ({})",
                    Theme::primary("Files:"),
                    Theme::value(&files.to_string()),
                    Theme::primary("Dirs:"),
                    Theme::value(&dirs.to_string()),
                    Theme::primary("Total:"),
                    Theme::value(&total_blocks.to_string()),
                    bytesize::to_string(*total_bytes, true)
                );
                bar.set_length(*total_blocks);
            }
            BuildEvent::RecoveryMerged { adopted, stale } => {
                bar.println(format!(
                    "Loaded results of the last interrupted check ({} hashes reused)",
                    adopted
                ));
                if *stale > 0 {
                    bar.println(format!(
                        "{} {} recovered paths no longer exist; the tree changed since the interrupted run and reused hashes may be wrong",
                        Theme::warning("Warning:"),
                        stale
                    ));
                }
            }
            BuildEvent::Phase(BuildPhase::Hashing) => {
                bar.println("Calculating sha256...");
            }
            BuildEvent::ReadFailed { path, error } => {
                if mode >= OutputMode::Verbose {
                    bar.println(format!("{} {} ({})", Theme::error("File read failed:"), path, error));
                } else {
                    bar.println(format!("{} {}", Theme::error("File read failed:"), path));
                }
            }
            BuildEvent::RecoveryCommitted { entries } => {
                if mode >= OutputMode::Verbose {
                    bar.println(Theme::muted(&format!("Progress committed ({} files)", entries)).to_string());
                }
            }
            BuildEvent::SnapshotWritten { path, .. } => {
                progress::finish_and_clear(&bar);
                println!("Saved sha256 results to {}", path.display());
            }
            BuildEvent::Phase(_) => {}
        }
    })
}

pub fn print_human(outcome: &AuditOutcome, mode: OutputMode) {
    if mode == OutputMode::Quiet {
        return;
    }

    let report = match outcome {
        AuditOutcome::NoBaseline { .. } => {
            println!("{}", Theme::warning("No previous sha256 snapshot found, nothing to compare."));
            return;
        }
        AuditOutcome::Compared(report) => report,
    };

    println!();
    println!("{}", Theme::header("sha256 Comparison Results"));
    println!("{}", Theme::divider_bold(50));
    println!(
        "{} {}  {} {}",
        Theme::primary("Current:"),
        Theme::value(report.current.as_str()),
        Theme::primary("Baseline:"),
        Theme::value(report.baseline.as_str())
    );
    println!("{}", Theme::divider(50));

    for kind in DiffKind::ALL {
        let paths = report.diff.get(kind);
        println!("{:<10} {:>8}", Theme::kind(kind.label()), Theme::value(&paths.len().to_string()));

        let limit = match mode {
            OutputMode::VeryVerbose => paths.len(),
            OutputMode::Verbose => 3,
            _ => 0,
        };
        for path in paths.iter().take(limit) {
            println!("  {}", Theme::muted(path));
        }
        if limit > 0 && paths.len() > limit {
            println!("  {}", Theme::muted(&format!("... and {} more", paths.len() - limit)));
        }
    }

    println!("{}", Theme::divider(50));
    if report.diff.is_clean() {
        println!("{}", Theme::success("All files match the baseline."));
    } else {
        for file in &report.written {
            println!("  {} {}", Theme::muted("wrote"), file.display());
        }
    }
    println!("{}", summary_line(&report.diff));
}

/// One-line totals printed at the end of a comparison
pub fn summary_line(diff: &DiffResult) -> String {
    format!(
        "All done! Added: {}  deleted: {}  changed: {}  errors: {}",
        diff.added.len(),
        diff.deleted.len(),
        diff.changed.len(),
        diff.errors.len()
    )
}

pub fn print_json(outcome: &AuditOutcome) -> anyhow::Result<()> {
    println!("{}", to_json(outcome)?);
    Ok(())
}

fn to_json(outcome: &AuditOutcome) -> anyhow::Result<String> {
    let report: Option<&AuditReport> = match outcome {
        AuditOutcome::Compared(report) => Some(report),
        AuditOutcome::NoBaseline { .. } => None,
    };
    let build = match outcome {
        AuditOutcome::Compared(report) => report.build.as_ref(),
        AuditOutcome::NoBaseline { build } => build.as_ref(),
    };

    let counts = report
        .map(|r| JsonCounts {
            added: r.diff.added.len(),
            deleted: r.diff.deleted.len(),
            changed: r.diff.changed.len(),
            errors: r.diff.errors.len(),
        })
        .unwrap_or_default();

    let json = JsonReport {
        version: "1.0",
        timestamp: chrono::Local::now().to_rfc3339(),
        status: if report.is_some() { "compared" } else { "no_baseline" },
        current: report
            .map(|r| r.current.to_string())
            .or_else(|| build.map(|b| b.identity.to_string())),
        baseline: report.map(|r| r.baseline.to_string()),
        stem: report.map(|r| r.stem.to_string()),
        files_hashed: build.map(|b| b.progress.files_count),
        counts,
        diff: report.map(|r| &r.diff),
        written: report
            .map(|r| r.written.iter().map(|p| p.display().to_string()).collect())
            .unwrap_or_default(),
    };

    Ok(serde_json::to_string_pretty(&json)?)
}

/// Print known snapshots, oldest first
pub fn print_snapshot_list(entries: &[(SnapshotId, Option<usize>)], mode: OutputMode) {
    if mode == OutputMode::Quiet {
        return;
    }
    if entries.is_empty() {
        println!("{}", Theme::muted("No sha256 snapshots found."));
        return;
    }
    for (identity, count) in entries {
        match count {
            Some(count) => println!("{}  {} files", Theme::value(identity.as_str()), count),
            None => println!("{}", Theme::value(identity.as_str())),
        }
    }
}
