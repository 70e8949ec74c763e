//! Exclusive lock held for the duration of a run
//!
//! Two runs sharing a progress file would interleave whole-file rewrites, so
//! a run takes an advisory `fd-lock` on `<progress_file>.lock` first. The OS
//! drops the lock when the process dies; there is nothing stale to clean up.

use crate::error::SweepError;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use fd_lock::{RwLock, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Seek, Write};
use tracing::debug;

/// Written into the lock file so a blocked run can name the holder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    pub pid: u32,
    pub acquired_at: DateTime<Utc>,
}

pub struct RunLock {
    path: Utf8PathBuf,
    lock: RwLock<File>,
}

impl RunLock {
    /// Open (creating if needed) the lock file beside `progress_file`.
    ///
    /// # Errors
    ///
    /// [`SweepError::Io`] if the lock file cannot be created.
    pub fn open(progress_file: &Utf8Path) -> Result<Self, SweepError> {
        let path = Utf8PathBuf::from(format!("{progress_file}.lock"));
        if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SweepError::io(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| SweepError::io(&path, e))?;
        Ok(Self {
            path,
            lock: RwLock::new(file),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Take the lock without blocking. Released when the guard drops.
    ///
    /// # Errors
    ///
    /// [`SweepError::RunLocked`] if another process holds it.
    pub fn try_acquire(&mut self) -> Result<RwLockWriteGuard<'_, File>, SweepError> {
        let path = self.path.clone();
        let mut guard = match self.lock.try_write() {
            Ok(guard) => guard,
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                return Err(SweepError::RunLocked {
                    holder: read_holder(&path),
                    path,
                });
            }
            Err(e) => return Err(SweepError::io(path, e)),
        };

        let info = LockInfo {
            pid: std::process::id(),
            acquired_at: Utc::now(),
        };
        if let Err(e) = write_info(&mut guard, &info) {
            debug!(path = %path, error = %e, "could not record lock holder");
        }
        Ok(guard)
    }
}

fn write_info(file: &mut File, info: &LockInfo) -> std::io::Result<()> {
    let json = serde_json::to_string(info).map_err(std::io::Error::other)?;
    file.set_len(0)?;
    file.rewind()?;
    file.write_all(json.as_bytes())?;
    file.sync_all()
}

fn read_holder(path: &Utf8Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    let info: LockInfo = serde_json::from_str(&content).ok()?;
    Some(format!(
        "pid {} since {}",
        info.pid,
        info.acquired_at.format("%Y-%m-%d %H:%M:%S UTC")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn progress_path(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join("progress.json")).unwrap()
    }

    #[test]
    fn test_second_acquire_is_refused_while_held() {
        let dir = TempDir::new().unwrap();
        let mut first = RunLock::open(&progress_path(&dir)).unwrap();
        let mut second = RunLock::open(&progress_path(&dir)).unwrap();
        assert!(first.path().as_str().ends_with("progress.json.lock"));

        let guard = first.try_acquire().unwrap();
        match second.try_acquire() {
            Err(SweepError::RunLocked { holder, .. }) => {
                let holder = holder.unwrap();
                assert!(holder.starts_with(&format!("pid {}", std::process::id())));
            }
            other => panic!("expected RunLocked, got {:?}", other.map(|_| ())),
        }

        drop(guard);
        assert!(second.try_acquire().is_ok());
    }

    #[test]
    fn test_lock_file_created_with_missing_parent() {
        let dir = TempDir::new().unwrap();
        let nested = Utf8PathBuf::from_path_buf(dir.path().join("state/progress.json")).unwrap();
        let mut lock = RunLock::open(&nested).unwrap();
        assert!(lock.try_acquire().is_ok());
        assert!(lock.path().exists());
    }
}
