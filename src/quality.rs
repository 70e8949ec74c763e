//! Quality gate: word-count acceptance of an output artifact

use camino::Utf8Path;
use std::io::ErrorKind;

/// Number of whitespace-separated words.
#[must_use]
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[must_use]
pub fn is_acceptable(text: &str, min_words: usize) -> bool {
    word_count(text) >= min_words
}

/// Result of checking an artifact on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assessment {
    Missing,
    Present { words: usize, acceptable: bool },
}

impl Assessment {
    #[must_use]
    pub const fn is_acceptable(&self) -> bool {
        matches!(self, Self::Present { acceptable: true, .. })
    }
}

/// Read an output artifact, `Ok(None)` when it does not exist.
///
/// Invalid UTF-8 is replaced rather than rejected; the gate only counts words.
pub fn read_output(path: &Utf8Path) -> std::io::Result<Option<String>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Read and gate an artifact in one step.
pub fn assess(path: &Utf8Path, min_words: usize) -> std::io::Result<Assessment> {
    Ok(match read_output(path)? {
        None => Assessment::Missing,
        Some(text) => {
            let words = word_count(&text);
            Assessment::Present {
                words,
                acceptable: words >= min_words,
            }
        }
    })
}
