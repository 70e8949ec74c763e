//! Error taxonomy for reqsweep
//!
//! Two tiers: [`UnitError`] is local to one unit of work and always ends up
//! as a `failed` outcome record; [`SweepError`] aborts the whole invocation
//! and maps to a process exit code.

use camino::Utf8PathBuf;
use reqsweep_runner::RunnerError;
use reqsweep_utils::exit_codes::ExitCode;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

/// Configuration problems, all reported with exit code 2.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Failed to load config file {path}: {reason}")]
    File { path: Utf8PathBuf, reason: String },

    #[error("Cannot determine the projects root: set PROJECTS_DIR or pass --root")]
    NoRoot,

    #[error("Failed to read prompt file {path}: {reason}")]
    PromptFile { path: Utf8PathBuf, reason: String },
}

/// Why a unit was recorded as `failed`. Persisted in the outcome record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum FailureReason {
    SpawnError,
    Timeout,
    NoOutputProduced,
    QualityTooLow,
    IoError,
}

/// Failure of a single unit. Never propagates past the worker that hit it.
#[derive(Error, Debug)]
pub enum UnitError {
    #[error("could not start tool: {0}")]
    Spawn(String),

    #[error("tool exceeded {secs}s and was terminated")]
    Timeout { secs: u64 },

    #[error("tool exited (code {exit_code:?}) without writing {path}")]
    NoOutputProduced {
        path: Utf8PathBuf,
        exit_code: Option<i32>,
    },

    #[error("output has {words} words, at least {required} required")]
    QualityTooLow { words: usize, required: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl UnitError {
    #[must_use]
    pub const fn reason(&self) -> FailureReason {
        match self {
            Self::Spawn(_) => FailureReason::SpawnError,
            Self::Timeout { .. } => FailureReason::Timeout,
            Self::NoOutputProduced { .. } => FailureReason::NoOutputProduced,
            Self::QualityTooLow { .. } => FailureReason::QualityTooLow,
            Self::Io(_) => FailureReason::IoError,
        }
    }

    /// Word count worth recording alongside the failure.
    #[must_use]
    pub const fn words(&self) -> usize {
        match self {
            Self::QualityTooLow { words, .. } => *words,
            _ => 0,
        }
    }
}

impl From<RunnerError> for UnitError {
    fn from(err: RunnerError) -> Self {
        match err {
            RunnerError::Spawn { .. } => Self::Spawn(err.to_string()),
            RunnerError::Wait { .. } => Self::Io(std::io::Error::other(err.to_string())),
        }
    }
}

/// Errors that end the invocation.
#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Projects root {path} is not a readable directory: {reason}")]
    Discovery { path: Utf8PathBuf, reason: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Another run already holds {path}{}", holder_suffix(.holder))]
    RunLocked {
        path: Utf8PathBuf,
        holder: Option<String>,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start async runtime: {0}")]
    Runtime(std::io::Error),

    #[error("Interrupted")]
    Interrupted,
}

fn holder_suffix(holder: &Option<String>) -> String {
    holder.as_ref().map(|h| format!(" ({h})")).unwrap_or_default()
}

impl SweepError {
    pub(crate) fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub const fn to_exit_code(&self) -> ExitCode {
        match self {
            Self::Discovery { .. } => ExitCode::DISCOVERY,
            Self::Config(_) => ExitCode::CLI_ARGS,
            Self::RunLocked { .. } => ExitCode::LOCK_HELD,
            Self::Interrupted => ExitCode::INTERRUPTED,
            Self::Io { .. } | Self::Runtime(_) => ExitCode::INTERNAL,
        }
    }

    /// One-line hint printed under the error message.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Discovery { .. } => {
                Some("Check PROJECTS_DIR or pass --root <DIR> pointing at the projects directory")
            }
            Self::Config(ConfigError::NoRoot) => Some("export PROJECTS_DIR=/path/to/projects"),
            Self::Config(_) => Some("Fix the value in .reqsweep/config.toml or on the command line"),
            Self::RunLocked { .. } => {
                Some("Wait for the other run to finish, or use a different --progress-file")
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_exit_code_mapping() {
        let discovery = SweepError::Discovery {
            path: "/nope".into(),
            reason: "missing".to_string(),
        };
        assert_eq!(discovery.to_exit_code(), ExitCode::DISCOVERY);
        assert_eq!(
            SweepError::Config(ConfigError::NoRoot).to_exit_code(),
            ExitCode::CLI_ARGS
        );
        assert_eq!(
            SweepError::RunLocked {
                path: "p.lock".into(),
                holder: None
            }
            .to_exit_code(),
            ExitCode::LOCK_HELD
        );
        assert_eq!(SweepError::Interrupted.to_exit_code(), ExitCode::INTERRUPTED);
    }

    #[test]
    fn test_unit_error_reasons() {
        assert_eq!(UnitError::Timeout { secs: 180 }.reason(), FailureReason::Timeout);
        let low = UnitError::QualityTooLow {
            words: 120,
            required: 2000,
        };
        assert_eq!(low.reason(), FailureReason::QualityTooLow);
        assert_eq!(low.words(), 120);
        assert_eq!(
            UnitError::NoOutputProduced {
                path: "a/requirements.md".into(),
                exit_code: Some(1)
            }
            .words(),
            0
        );
    }

    #[test]
    fn test_runner_spawn_maps_to_spawn() {
        let err = RunnerError::Spawn {
            program: "claude".to_string(),
            reason: "No such file or directory".to_string(),
        };
        let unit: UnitError = err.into();
        assert_eq!(unit.reason(), FailureReason::SpawnError);
        assert!(unit.to_string().contains("claude"));
    }

    #[test]
    fn test_failure_reason_strings() {
        assert_eq!(FailureReason::NoOutputProduced.to_string(), "no-output-produced");
        assert_eq!(
            FailureReason::from_str("quality-too-low").unwrap(),
            FailureReason::QualityTooLow
        );
        assert_eq!(
            serde_json::to_string(&FailureReason::SpawnError).unwrap(),
            "\"spawn-error\""
        );
    }

    #[test]
    fn test_run_locked_message_names_holder() {
        let err = SweepError::RunLocked {
            path: "progress.json.lock".into(),
            holder: Some("pid 4242".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Another run already holds progress.json.lock (pid 4242)"
        );
    }
}
