//! Command-line interface for reqsweep
//!
//! - `args`: clap definitions and the derived [`Operation`]
//! - `run`: entry point, logging setup, config discovery and error output
//! - `commands`: one handler per operation

pub mod args;
mod commands;
mod run;

pub use args::{Cli, Operation};
pub use run::run;
