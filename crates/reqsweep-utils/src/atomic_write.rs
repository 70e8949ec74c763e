//! Crash-safe file replacement for the progress ledger
//!
//! A write goes to a temporary file in the destination directory, is fsynced,
//! and is then renamed over the target. Readers observe either the previous
//! document or the new one, never a torn mix of both.

use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use tempfile::NamedTempFile;

#[cfg(target_os = "windows")]
use std::{thread, time::Duration};

/// Atomically replace `path` with `content`.
///
/// The parent directory is created when missing. On Windows the rename is
/// retried briefly because antivirus and indexers hold transient handles.
pub fn write_file_atomic(path: &Utf8Path, content: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_str().is_empty() => p,
        _ => Utf8Path::new("."),
    };

    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create parent directory: {parent}"))?;

    let mut temp_file = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temporary file in: {parent}"))?;

    temp_file
        .write_all(content.as_bytes())
        .context("Failed to write content to temporary file")?;

    temp_file
        .as_file()
        .sync_all()
        .context("Failed to fsync temporary file")?;

    persist(temp_file, path.as_std_path()).with_context(|| format!("Failed to replace {path}"))
}

/// Remove a file, treating "already gone" as success.
///
/// Returns `true` when a file was actually deleted.
pub fn remove_if_exists(path: &Utf8Path) -> std::io::Result<bool> {
    match fs::remove_file(path.as_std_path()) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(not(target_os = "windows"))]
fn persist(temp_file: NamedTempFile, target: &Path) -> Result<()> {
    temp_file
        .persist(target)
        .map(|_| ())
        .map_err(|e| anyhow::anyhow!(e.error))
}

#[cfg(target_os = "windows")]
fn persist(mut temp_file: NamedTempFile, target: &Path) -> Result<()> {
    const MAX_ATTEMPTS: u32 = 5;
    const BACKOFF_MS: u64 = 20;

    let mut attempt = 0;
    loop {
        match temp_file.persist(target) {
            Ok(_) => return Ok(()),
            Err(err) if attempt < MAX_ATTEMPTS && err.error.kind() == ErrorKind::PermissionDenied => {
                attempt += 1;
                thread::sleep(Duration::from_millis(BACKOFF_MS * u64::from(attempt)));
                temp_file = err.file;
            }
            Err(err) => return Err(anyhow::anyhow!(err.error)),
        }
    }
}
