//! Worker pool draining a shared queue of units
//!
//! Each worker pops one unit at a time, runs it through skip gate, tool,
//! acceptance gate and classifier, and records the outcome before taking the
//! next. Per-unit failures never leave the worker.

use crate::classify::{self, EXISTING, UNKNOWN};
use crate::config::{Config, ToolConfig};
use crate::discovery::UnitOfWork;
use crate::error::UnitError;
use crate::payload::Payload;
use crate::progress::{ProgressStore, UnitStatus};
use crate::quality::{self, Assessment};
use crate::report::format_duration;
use reqsweep_runner::ToolInvoker;
use reqsweep_utils::logging::unit_span;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{Instrument, debug, error, info, warn};

/// Units waiting for a worker. `pop` is the only way out.
#[derive(Debug, Default)]
pub struct WorkQueue {
    units: Mutex<VecDeque<UnitOfWork>>,
}

impl WorkQueue {
    #[must_use]
    pub fn new(units: Vec<UnitOfWork>) -> Self {
        Self {
            units: Mutex::new(units.into()),
        }
    }

    /// Remove and return the next unit, or `None` once drained.
    pub fn pop(&self) -> Option<UnitOfWork> {
        self.units
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.units.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per-run knobs the pool needs from [`Config`].
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub workers: usize,
    pub min_words: usize,
    pub accept_min_words: usize,
    pub unit_timeout: Duration,
    pub inter_unit_delay: Duration,
}

impl From<&Config> for PoolSettings {
    fn from(config: &Config) -> Self {
        Self {
            workers: config.workers,
            min_words: config.min_words,
            accept_min_words: config.accept_min_words,
            unit_timeout: config.unit_timeout(),
            inter_unit_delay: config.inter_unit_delay(),
        }
    }
}

/// Everything a worker shares with its siblings.
pub struct WorkerContext {
    pub store: Arc<ProgressStore>,
    pub invoker: Arc<dyn ToolInvoker>,
    pub tool: ToolConfig,
    pub payload: Payload,
    pub settings: PoolSettings,
}

/// Result of handling one unit, before it is recorded.
#[derive(Debug)]
pub enum UnitOutcome {
    /// Existing output already passed the skip gate
    Skipped { words: usize },
    Success {
        category: &'static str,
        words: usize,
        duration: Duration,
    },
    Failed(UnitError),
}

impl UnitOutcome {
    #[must_use]
    pub const fn status(&self) -> UnitStatus {
        match self {
            Self::Skipped { .. } => UnitStatus::Skipped,
            Self::Success { .. } => UnitStatus::Success,
            Self::Failed(_) => UnitStatus::Failed,
        }
    }
}

/// Handle one unit end to end. Does not record.
pub async fn process_unit(ctx: &WorkerContext, unit: &UnitOfWork) -> UnitOutcome {
    let settings = &ctx.settings;

    match quality::assess(&unit.output_path, settings.min_words) {
        Ok(Assessment::Present {
            words,
            acceptable: true,
        }) => return UnitOutcome::Skipped { words },
        Ok(Assessment::Present { words, .. }) => {
            debug!(words, required = settings.min_words, "existing output below threshold, regenerating");
        }
        Ok(Assessment::Missing) => {}
        Err(e) => return UnitOutcome::Failed(e.into()),
    }

    if let Err(e) = tokio::fs::create_dir_all(unit.output_dir()).await {
        return UnitOutcome::Failed(e.into());
    }

    let command = ctx.tool.command_for(unit);
    let started = Instant::now();
    let result = match ctx
        .invoker
        .invoke(&command, ctx.payload.as_str(), settings.unit_timeout)
        .await
    {
        Ok(result) => result,
        Err(e) => return UnitOutcome::Failed(e.into()),
    };

    if result.timed_out {
        return UnitOutcome::Failed(UnitError::Timeout {
            secs: settings.unit_timeout.as_secs(),
        });
    }
    if result.exit_code != Some(0) {
        warn!(
            exit_code = ?result.exit_code,
            stderr = result.stderr_tail().unwrap_or(""),
            "tool exited unsuccessfully"
        );
    }

    let text = match quality::read_output(&unit.output_path) {
        Ok(Some(text)) => text,
        Ok(None) => {
            return UnitOutcome::Failed(UnitError::NoOutputProduced {
                path: unit.output_path.clone(),
                exit_code: result.exit_code,
            });
        }
        Err(e) => return UnitOutcome::Failed(e.into()),
    };

    let words = quality::word_count(&text);
    if words < settings.accept_min_words {
        return UnitOutcome::Failed(UnitError::QualityTooLow {
            words,
            required: settings.accept_min_words,
        });
    }

    UnitOutcome::Success {
        category: classify::classify(&text),
        words,
        duration: started.elapsed(),
    }
}

fn record(store: &ProgressStore, unit: &UnitOfWork, outcome: &UnitOutcome) {
    match outcome {
        UnitOutcome::Skipped { words } => {
            store.record_outcome(&unit.id, EXISTING, UnitStatus::Skipped, *words, None);
        }
        UnitOutcome::Success {
            category, words, ..
        } => {
            store.record_outcome(&unit.id, category, UnitStatus::Success, *words, None);
        }
        UnitOutcome::Failed(err) => store.record_outcome(
            &unit.id,
            UNKNOWN,
            UnitStatus::Failed,
            err.words(),
            Some(err.reason()),
        ),
    }
}

fn log_outcome(outcome: &UnitOutcome) {
    match outcome {
        UnitOutcome::Skipped { words } => info!(status = "skipped", words, "✓ existing output is sufficient"),
        UnitOutcome::Success {
            category,
            words,
            duration,
        } => info!(
            status = "success",
            platform = category,
            words,
            elapsed = %format_duration(*duration),
            "✓ requirements generated"
        ),
        UnitOutcome::Failed(err) => warn!(
            status = "failed",
            reason = %err.reason(),
            "✗ {err}"
        ),
    }
}

async fn run_worker(worker: usize, queue: Arc<WorkQueue>, ctx: Arc<WorkerContext>) -> usize {
    debug!(worker, "worker started");
    let mut handled = 0;
    while let Some(unit) = queue.pop() {
        let span = unit_span(worker, &unit.id);
        let outcome = process_unit(&ctx, &unit).instrument(span.clone()).await;
        span.in_scope(|| log_outcome(&outcome));
        record(&ctx.store, &unit, &outcome);
        handled += 1;

        if !ctx.settings.inter_unit_delay.is_zero() && !queue.is_empty() {
            tokio::time::sleep(ctx.settings.inter_unit_delay).await;
        }
    }
    debug!(worker, handled, "no more units, worker finished");
    handled
}

/// Run workers until the queue is drained and every in-flight unit is recorded.
///
/// Returns the number of units handled. Dropping the returned future aborts
/// the workers, which kills any tool they are supervising.
pub async fn run_pool(ctx: Arc<WorkerContext>, queue: Arc<WorkQueue>) -> usize {
    let workers = ctx.settings.workers.min(queue.len()).max(1);
    let mut set = JoinSet::new();
    for worker in 1..=workers {
        set.spawn(run_worker(worker, Arc::clone(&queue), Arc::clone(&ctx)));
    }

    let mut handled = 0;
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(count) => handled += count,
            Err(e) => error!(error = %e, "worker task ended abnormally"),
        }
    }
    handled
}
