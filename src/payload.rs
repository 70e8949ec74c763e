//! Instruction payload written to the tool's stdin
//!
//! Built once per run. Paths in the task block are relative to the unit
//! directory, which is the tool's working directory, so every unit receives
//! the same bytes.

use crate::discovery::{MARKET_SPEC_FILE, OUTPUT_DIR, REQUIREMENTS_FILE, SPEC_FILE};
use crate::error::ConfigError;
use camino::Utf8Path;
use std::sync::Arc;

/// Preamble used when no prompt file is configured.
pub const BUILT_IN_PREAMBLE: &str = "\
You are creating a comprehensive requirements document for a software project.

Determine the project's real platform from all available evidence: the \
project directory name, the name and description in the specification, the \
features it lists and its technical stack. If the specification's \
project.type does not match that evidence, override it.

Fix discrepancies, empty arrays and placeholder content. Include \
platform-specific technical requirements, constraints and best practices. The \
document must be implementation-ready: a development team should be able to \
start building from it immediately.";

/// The fixed stdin payload for one run.
#[derive(Debug, Clone)]
pub struct Payload(Arc<str>);

impl Payload {
    /// Preamble followed by the task block.
    #[must_use]
    pub fn build(preamble: &str, min_words: usize) -> Self {
        let task = format!(
            "\
YOUR SPECIFIC TASK:
1. Read the specification file: {OUTPUT_DIR}/{SPEC_FILE}
2. Also read it if it exists: {OUTPUT_DIR}/{MARKET_SPEC_FILE}
3. The project ID is the name of the current working directory
4. Analyze all available context to determine the correct platform
5. Write comprehensive requirements (at least {min_words} words)
6. Save to: {OUTPUT_DIR}/{REQUIREMENTS_FILE}

Start by reading the specification files now.
"
        );
        Self(format!("{}\n\n{task}", preamble.trim_end()).into())
    }

    #[must_use]
    pub fn built_in(min_words: usize) -> Self {
        Self::build(BUILT_IN_PREAMBLE, min_words)
    }

    /// Use the contents of `path` as the preamble.
    ///
    /// # Errors
    ///
    /// [`ConfigError::PromptFile`] if the file is unreadable or blank.
    pub fn from_prompt_file(path: &Utf8Path, min_words: usize) -> Result<Self, ConfigError> {
        let preamble = std::fs::read_to_string(path).map_err(|e| ConfigError::PromptFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if preamble.trim().is_empty() {
            return Err(ConfigError::PromptFile {
                path: path.to_path_buf(),
                reason: "file is empty".to_string(),
            });
        }
        Ok(Self::build(&preamble, min_words))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
