//! reqsweep - resumable bulk generation of requirements documents
//!
//! reqsweep scans a directory of projects, queues every project that has an
//! `ai-generated/specification.yaml` and no recorded outcome, and drives an
//! external generation tool over the queue with a fixed pool of workers.
//!
//! ```text
//! discover ──► WorkQueue ──► worker × N ──► ProgressStore (JSON, atomic rewrite)
//!                              │
//!                              ├─ quality gate (skip existing output)
//!                              ├─ ToolRunner (stdin payload, timeout, TERM→KILL)
//!                              ├─ quality gate (accept new output)
//!                              └─ classify
//! ```
//!
//! Every outcome is persisted as soon as it is known, so an interrupted run
//! resumes where it stopped. Units already recorded, whatever their status,
//! are not retried until the progress file is reset.
//!
//! # Quick Start
//!
//! ```bash
//! # Process everything that is left
//! PROJECTS_DIR=~/projects reqsweep
//!
//! # Inspect progress
//! reqsweep --status
//! ```

pub mod classify;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod payload;
pub mod pool;
pub mod progress;
pub mod quality;
pub mod report;
pub mod run_lock;

pub use config::{CliArgs, Config, EnvSnapshot, ToolConfig};
pub use discovery::{UnitOfWork, discover};
pub use error::{ConfigError, FailureReason, SweepError, UnitError};
pub use pool::{PoolSettings, UnitOutcome, WorkQueue, WorkerContext, process_unit, run_pool};
pub use progress::{AggregateStats, OutcomeRecord, ProgressState, ProgressStore, UnitStatus};
pub use reqsweep_utils::exit_codes::ExitCode;
