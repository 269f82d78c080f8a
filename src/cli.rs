//! Command-line interface and command handlers

use clap::{ArgAction, Args, Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use crate::audit::Audit;
use crate::config::{self, Config};
use crate::output::{self, OutputMode};
use crate::progress::{self, Progress};
use crate::repository::SnapshotRepository;
use crate::theme::Theme;
use anyhow::Context;
use indicatif::ProgressBar;

#[derive(Parser)]
#[command(name = "sha256report")]
#[command(version)]
#[command(about = "Snapshot sha256 checksums of a directory tree and report what changed")]
#[command(long_about = "sha256report hashes every file under a directory, saves the result as \
    <YYYYMMDDHHmmss>.sha256 in that directory, and compares it with the previous snapshot.\n\n\
    Differences are written next to the snapshot as .added, .deleted, .changed and .error lists. \
    An interrupted run resumes from sha256report.tmp.\n\n\
    Examples:\n  \
    sha256report                      # Snapshot and compare the current directory\n  \
    sha256report run --path /backup   # Snapshot and compare /backup\n  \
    sha256report compare              # Compare the two newest snapshots only\n  \
    sha256report list -v              # List snapshots with file counts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Increase output verbosity (-v, -vv for more)
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Use this config file instead of the default location
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Directory to audit [default: current directory]
    #[arg(long, value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Bytes per hash read [default: 65536]
    #[arg(long, value_name = "BYTES")]
    pub block_size: Option<u64>,

    /// Seconds between recovery file commits [default: 20]
    #[arg(long, value_name = "SECS")]
    pub commit_interval: Option<u64>,

    /// Additional root-level name to skip (repeatable)
    #[arg(long, value_name = "NAME")]
    pub skip: Vec<String>,

    /// Output the run summary as JSON for scripting
    #[arg(long)]
    pub json: bool,

    /// Wait for Enter before exiting
    #[arg(long)]
    pub wait: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Hash the tree, save a snapshot, and compare it with the previous one
    #[command(visible_alias = "r")]
    Run(RunArgs),

    /// Compare the two newest snapshots without hashing
    #[command(visible_alias = "c")]
    Compare(RunArgs),

    /// List snapshots in a directory
    #[command(visible_alias = "l")]
    List {
        /// Directory holding snapshots [default: current directory]
        #[arg(long, value_name = "PATH")]
        path: Option<PathBuf>,
    },

    /// View or reset configuration
    Config {
        /// Show the effective configuration
        #[arg(long)]
        show: bool,

        /// Print the config file location
        #[arg(long)]
        path: bool,

        /// Write the default configuration to the config file
        #[arg(long)]
        reset: bool,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn run(self) -> anyhow::Result<()> {
        let output_mode = OutputMode::from_flags(self.quiet, self.verbose);
        let config_path = self.config.clone();

        match self.command {
            None => run_audit(RunArgs::default(), false, config_path.as_deref(), output_mode),
            Some(Commands::Run(args)) => run_audit(args, false, config_path.as_deref(), output_mode),
            Some(Commands::Compare(args)) => run_audit(args, true, config_path.as_deref(), output_mode),
            Some(Commands::List { path }) => {
                let dir = resolve_root(path)?;
                list_snapshots(&dir, output_mode)
            }
            Some(Commands::Config { show, path, reset }) => {
                handle_config(config_path.as_deref(), show, path, reset)
            }
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::from_file(path),
        None => Ok(Config::load()),
    }
}

fn resolve_root(path: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    match path {
        Some(path) => Ok(path),
        None => std::env::current_dir().context("Failed to determine current directory"),
    }
}

fn run_audit(
    args: RunArgs,
    skip_sha_check: bool,
    config_path: Option<&Path>,
    mode: OutputMode,
) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    config.apply_cli_overrides(
        args.block_size,
        args.commit_interval,
        &args.skip,
        skip_sha_check,
        args.wait,
    );
    config.validate()?;

    let root = resolve_root(args.path)?;
    if !root.is_dir() {
        anyhow::bail!("Not a directory: {}", root.display());
    }

    // JSON output owns stdout, so the human-readable stream is silenced
    let human_mode = if args.json { OutputMode::Quiet } else { mode };
    let bar = if human_mode == OutputMode::Quiet {
        ProgressBar::hidden()
    } else {
        progress::create_progress_bar(0, "")
    };

    let wait_for_enter = config.ui.wait_for_enter;
    if human_mode != OutputMode::Quiet && config.scan.skip_sha_check {
        println!("{}", Theme::muted("Skipping sha256 calculation, comparing existing snapshots"));
    }

    let outcome = Audit::new(&root, config)
        .with_progress(Progress::new().with_callback(progress::bar_callback(bar.clone())))
        .with_events(output::event_printer(human_mode, bar.clone()))
        .run();
    progress::finish_and_clear(&bar);
    let outcome = outcome?;

    if args.json {
        output::print_json(&outcome)?;
    } else {
        output::print_human(&outcome, mode);
    }

    if wait_for_enter {
        // stderr keeps a --json stdout clean
        wait_for_enter_key(&mut io::stdin().lock(), &mut io::stderr())?;
    }
    Ok(())
}

fn list_snapshots(dir: &Path, mode: OutputMode) -> anyhow::Result<()> {
    let repository = SnapshotRepository::new(dir);
    let identities = repository.list_snapshots()?;

    let mut entries = Vec::with_capacity(identities.len());
    for identity in identities {
        let count = if mode >= OutputMode::Verbose {
            Some(repository.load(&identity)?.len())
        } else {
            None
        };
        entries.push((identity, count));
    }

    output::print_snapshot_list(&entries, mode);
    Ok(())
}

fn handle_config(path: Option<&Path>, show: bool, print_path: bool, reset: bool) -> anyhow::Result<()> {
    let file = match path {
        Some(path) => Some(path.to_path_buf()),
        None => config::config_file_path(),
    };

    if print_path {
        match &file {
            Some(file) => println!("{}", file.display()),
            None => println!("{}", Theme::muted("No config directory available")),
        }
    }

    if reset {
        let file = file
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("No config directory available"))?;
        Config::default().save(file)?;
        println!("{} {}", Theme::success("Configuration reset:"), file.display());
    }

    if show || (!print_path && !reset) {
        let config = load_config(path)?;
        println!("{}", Theme::header("sha256report configuration"));
        println!("{}", Theme::divider(40));
        println!("{}", toml::to_string_pretty(&config).context("Failed to serialize config")?);
    }

    Ok(())
}

fn wait_for_enter_key<R: BufRead, W: Write>(input: &mut R, prompt: &mut W) -> anyhow::Result<()> {
    write!(prompt, "Press Enter to exit")?;
    prompt.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(())
}
