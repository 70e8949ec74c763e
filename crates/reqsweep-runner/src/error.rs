//! Error types for the runner crate

use thiserror::Error;

/// Failures that prevent the runner from supervising the tool at all.
///
/// A timeout is not an error at this layer: it is reported through
/// [`RunResult::timed_out`](crate::RunResult::timed_out) together with the
/// output captured before termination.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// The process could not be started (binary missing, not executable, bad cwd).
    #[error("Failed to spawn '{program}': {reason}")]
    Spawn { program: String, reason: String },

    /// The process started but waiting on it failed.
    #[error("Failed to wait for '{program}': {reason}")]
    Wait { program: String, reason: String },
}

impl RunnerError {
    /// True when the tool never started.
    #[must_use]
    pub const fn is_spawn(&self) -> bool {
        matches!(self, Self::Spawn { .. })
    }
}
