//! Durable ledger of per-unit outcomes
//!
//! The whole [`ProgressState`] is rewritten atomically after every recorded
//! outcome, so an interrupted run loses at most the unit that was in flight.
//! A missing or unreadable file is never fatal: it degrades to a fresh state.

use crate::error::{FailureReason, SweepError};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use reqsweep_utils::atomic_write::{remove_if_exists, write_file_atomic};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use strum::{Display, EnumString};
use tracing::{debug, error, warn};

/// Default progress file name, resolved against the working directory.
pub const DEFAULT_PROGRESS_FILE: &str = ".platform-regeneration-progress.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UnitStatus {
    Success,
    Failed,
    Skipped,
}

/// Persisted result for one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeRecord {
    pub detected_platform: String,
    pub status: UnitStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub word_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AggregateCounters {
    pub total_success: u64,
    pub total_failed: u64,
    pub total_skipped: u64,
    /// Success count per detected category
    pub platforms_detected: BTreeMap<String, u64>,
}

/// On-disk document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressState {
    pub start_time: DateTime<Utc>,
    pub completed_projects: BTreeMap<String, OutcomeRecord>,
    pub processed_count: u64,
    pub stats: AggregateCounters,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self {
            start_time: Utc::now(),
            completed_projects: BTreeMap::new(),
            processed_count: 0,
            stats: AggregateCounters::default(),
        }
    }
}

impl ProgressState {
    /// `processedCount` agrees with both the counters and the record map.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let s = &self.stats;
        s.total_success + s.total_failed + s.total_skipped == self.processed_count
            && self.processed_count == self.completed_projects.len() as u64
    }

    /// Rebuild every aggregate from the record map.
    fn reconcile(&mut self) {
        let mut stats = AggregateCounters::default();
        for record in self.completed_projects.values() {
            stats.count(record, 1);
        }
        self.processed_count = self.completed_projects.len() as u64;
        self.stats = stats;
    }

    fn insert(&mut self, id: String, record: OutcomeRecord) {
        self.stats.count(&record, 1);
        self.processed_count += 1;
        if let Some(previous) = self.completed_projects.insert(id, record) {
            self.stats.count(&previous, -1);
            self.processed_count -= 1;
        }
    }
}

impl AggregateCounters {
    fn count(&mut self, record: &OutcomeRecord, delta: i64) {
        let bump = |n: &mut u64| *n = n.saturating_add_signed(delta);
        match record.status {
            UnitStatus::Success => {
                bump(&mut self.total_success);
                let entry = self
                    .platforms_detected
                    .entry(record.detected_platform.clone())
                    .or_default();
                bump(&mut *entry);
                if *entry == 0 {
                    self.platforms_detected.remove(&record.detected_platform);
                }
            }
            UnitStatus::Failed => bump(&mut self.total_failed),
            UnitStatus::Skipped => bump(&mut self.total_skipped),
        }
    }
}

/// Read-only snapshot for reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateStats {
    pub total_processed: u64,
    pub total_success: u64,
    pub total_failed: u64,
    pub total_skipped: u64,
    pub platforms_detected: BTreeMap<String, u64>,
}

impl AggregateStats {
    /// Category histogram, most frequent first, ties by name.
    #[must_use]
    pub fn sorted_platforms(&self) -> Vec<(&str, u64)> {
        let mut platforms: Vec<(&str, u64)> = self
            .platforms_detected
            .iter()
            .map(|(name, count)| (name.as_str(), *count))
            .collect();
        platforms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        platforms
    }
}

/// Thread-safe owner of the progress file.
#[derive(Debug)]
pub struct ProgressStore {
    path: Utf8PathBuf,
    state: Mutex<ProgressState>,
}

impl ProgressStore {
    /// Load from `path`; missing or malformed files give a fresh state.
    #[must_use]
    pub fn load(path: impl Into<Utf8PathBuf>) -> Self {
        let path = path.into();
        let state = read_state(&path);
        Self {
            path,
            state: Mutex::new(state),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, ProgressState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// True iff a record exists for `id`, whatever its status.
    #[must_use]
    pub fn is_complete(&self, id: &str) -> bool {
        self.lock().completed_projects.contains_key(id)
    }

    #[must_use]
    pub fn has_history(&self) -> bool {
        self.lock().processed_count > 0
    }

    /// Record one outcome and persist the whole state before releasing the lock.
    ///
    /// A failed write is logged and swallowed; the in-memory state stays
    /// authoritative and the next successful write catches the file up.
    pub fn record_outcome(
        &self,
        id: &str,
        category: &str,
        status: UnitStatus,
        word_count: usize,
        reason: Option<FailureReason>,
    ) {
        let record = OutcomeRecord {
            detected_platform: category.to_string(),
            status,
            timestamp: Utc::now(),
            word_count,
            reason,
        };

        let mut state = self.lock();
        state.insert(id.to_string(), record);
        self.persist(&state);
    }

    #[must_use]
    pub fn stats(&self) -> AggregateStats {
        let state = self.lock();
        AggregateStats {
            total_processed: state.processed_count,
            total_success: state.stats.total_success,
            total_failed: state.stats.total_failed,
            total_skipped: state.stats.total_skipped,
            platforms_detected: state.stats.platforms_detected.clone(),
        }
    }

    /// Copy of the full state.
    #[must_use]
    pub fn snapshot(&self) -> ProgressState {
        self.lock().clone()
    }

    /// Delete the progress file and start over in memory.
    ///
    /// # Errors
    ///
    /// Fails only if an existing file cannot be removed.
    pub fn reset(&self) -> Result<bool, SweepError> {
        let mut state = self.lock();
        let removed = remove_if_exists(&self.path).map_err(|e| SweepError::io(&self.path, e))?;
        *state = ProgressState::default();
        Ok(removed)
    }

    fn persist(&self, state: &ProgressState) {
        let json = match serde_json::to_string_pretty(state) {
            Ok(json) => json,
            Err(e) => {
                error!(path = %self.path, error = %e, "failed to serialize progress");
                return;
            }
        };
        if let Err(e) = write_file_atomic(&self.path, &json) {
            error!(path = %self.path, error = %format!("{e:#}"), "failed to save progress");
        }
    }
}

fn read_state(path: &Utf8Path) -> ProgressState {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path, "no progress file, starting fresh");
            return ProgressState::default();
        }
        Err(e) => {
            warn!(path = %path, error = %e, "cannot read progress file, starting fresh");
            return ProgressState::default();
        }
    };

    match serde_json::from_str::<ProgressState>(&content) {
        Ok(mut state) => {
            if !state.is_consistent() {
                warn!(path = %path, "progress counters disagree with records, rebuilding");
                state.reconcile();
            }
            state
        }
        Err(e) => {
            warn!(path = %path, error = %e, "progress file is malformed, starting fresh");
            ProgressState::default()
        }
    }
}
