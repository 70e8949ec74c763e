//! CLI argument definitions

use crate::config::CliArgs;
use camino::Utf8PathBuf;
use clap::Parser;

/// reqsweep - resumable bulk generation of requirements documents
#[derive(Parser, Debug)]
#[command(name = "reqsweep")]
#[command(about = "Drive an external tool over every project missing a qualifying requirements.md")]
#[command(long_about = r#"
reqsweep walks a projects directory, finds every project with
ai-generated/specification.yaml that has not been processed yet, and runs the
generation tool for each one with a pool of workers. Progress is saved after
every project, so an interrupted run continues where it stopped.

EXAMPLES:
  # Process everything that is left (resumes automatically)
  reqsweep --root ~/projects

  # Show what has been done so far
  reqsweep --status

  # Start over, forgetting all recorded outcomes
  reqsweep --fresh

  # See the queue and effective settings without running anything
  reqsweep --dry-run --workers 3

CONFIGURATION:
  Precedence: CLI flags > environment > config file > defaults
  Config file is discovered by searching upward from CWD for .reqsweep/config.toml
  Environment: PROJECTS_DIR (projects root), REQSWEEP_TOOL (tool program)
"#)]
#[command(version)]
pub struct Cli {
    /// Print aggregate progress and exit
    #[arg(long, conflicts_with_all = ["reset", "fresh", "dry_run"])]
    pub status: bool,

    /// Delete the progress file and exit
    #[arg(long, conflicts_with_all = ["fresh", "dry_run"])]
    pub reset: bool,

    /// Reset progress, then run
    #[arg(long)]
    pub fresh: bool,

    /// Discover and print the queue without invoking the tool
    #[arg(long, conflicts_with = "fresh")]
    pub dry_run: bool,

    /// Path to configuration file (overrides discovery)
    #[arg(long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Projects root directory
    #[arg(long, value_name = "DIR")]
    pub root: Option<Utf8PathBuf>,

    /// Number of concurrent workers
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Skip projects whose existing requirements.md has at least this many words
    #[arg(long, value_name = "N")]
    pub min_words: Option<usize>,

    /// Accept newly generated output with at least this many words
    #[arg(long, value_name = "N")]
    pub accept_words: Option<usize>,

    /// Per-project tool timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Pause between projects on the same worker, in milliseconds
    #[arg(long, value_name = "MS")]
    pub delay_ms: Option<u64>,

    /// Progress file location
    #[arg(long, value_name = "FILE")]
    pub progress_file: Option<Utf8PathBuf>,

    /// Generation tool program
    #[arg(long, value_name = "PROGRAM")]
    pub tool: Option<String>,

    /// Replace the built-in instruction preamble with this file's contents
    #[arg(long, value_name = "FILE")]
    pub prompt_file: Option<Utf8PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// The single operation an invocation performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Status,
    Reset,
    DryRun,
    Run { fresh: bool },
}

impl Cli {
    #[must_use]
    pub const fn operation(&self) -> Operation {
        if self.status {
            Operation::Status
        } else if self.reset {
            Operation::Reset
        } else if self.dry_run {
            Operation::DryRun
        } else {
            Operation::Run { fresh: self.fresh }
        }
    }

    #[must_use]
    pub fn cli_args(&self) -> CliArgs {
        CliArgs {
            config_path: self.config.clone(),
            root_dir: self.root.clone(),
            workers: self.workers,
            min_words: self.min_words,
            accept_min_words: self.accept_words,
            timeout_secs: self.timeout,
            delay_ms: self.delay_ms,
            progress_file: self.progress_file.clone(),
            tool: self.tool.clone(),
            prompt_file: self.prompt_file.clone(),
        }
    }
}
