//! CLI entry point and dispatch
//!
//! `run()` owns all user-visible output, including errors. main.rs only maps
//! the returned [`ExitCode`] onto the process exit status.

use clap::Parser;
use reqsweep_utils::exit_codes::ExitCode;
use reqsweep_utils::logging;

use super::args::{Cli, Operation};
use super::commands;
use crate::config::Config;
use crate::error::SweepError;

/// Parse arguments, resolve configuration and run the selected operation.
///
/// # Errors
///
/// Returns the exit code for the failure after printing it.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    if let Err(e) = logging::init_tracing(cli.verbose) {
        eprintln!("warning: failed to initialize logging: {e}");
    }

    execute(&cli).map_err(|err| {
        if !matches!(err, SweepError::Interrupted) {
            eprintln!("✗ {err}");
            if let Some(hint) = err.suggestion() {
                eprintln!("  {hint}");
            }
        }
        err.to_exit_code()
    })
}

fn execute(cli: &Cli) -> Result<(), SweepError> {
    let config = Config::discover(&cli.cli_args())?;

    match cli.operation() {
        Operation::Status => commands::status(&config),
        Operation::Reset => commands::reset(&config),
        Operation::DryRun => commands::dry_run(&config),
        Operation::Run { fresh } => commands::sweep(&config, fresh),
    }
}
