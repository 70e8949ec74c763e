//! The default operation: discover and process remaining units

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqsweep_runner::ToolRunner;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::config::Config;
use crate::discovery;
use crate::error::SweepError;
use crate::payload::Payload;
use crate::pool::{self, PoolSettings, WorkQueue, WorkerContext};
use crate::progress::ProgressStore;
use crate::report;
use crate::run_lock::RunLock;

/// How long an interrupted run waits for aborted workers to kill their tools.
const INTERRUPT_CLEANUP: Duration = Duration::from_millis(500);

pub fn sweep(config: &Config, fresh: bool) -> Result<(), SweepError> {
    let mut lock = RunLock::open(&config.progress_file)?;
    let _guard = lock.try_acquire()?;

    let store = Arc::new(ProgressStore::load(config.progress_file.clone()));
    if fresh {
        store.reset()?;
        println!("✓ Progress reset, starting a fresh run");
    } else if store.has_history() {
        println!("{}\n", report::resume_banner(&store.stats()));
    }

    println!("Analyzing remaining projects...");
    let units = discovery::discover(config.projects_root()?, &store)?;
    if units.is_empty() {
        println!("✓ All projects have been processed!");
        println!("  Use --status to see the summary or --reset to start over");
        return Ok(());
    }

    if config.tool.resolve().is_none() {
        warn!(
            tool = %config.tool.program,
            "tool not found on PATH; every project will fail with a spawn error"
        );
    }

    let payload = match &config.prompt_file {
        Some(path) => Payload::from_prompt_file(path, config.min_words)?,
        None => Payload::built_in(config.min_words),
    };

    let queued = units.len();
    println!(
        "{}\n",
        report::run_banner(
            queued,
            config.workers.min(queued),
            &discovery::platform_distribution(&units),
        )
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(SweepError::Runtime)?;

    let baseline = store.stats().total_processed;
    let ctx = Arc::new(WorkerContext {
        store: Arc::clone(&store),
        invoker: Arc::new(ToolRunner::new(config.buffers(), config.kill_grace())),
        tool: config.tool.clone(),
        payload,
        settings: PoolSettings::from(config),
    });
    let queue = Arc::new(WorkQueue::new(units));
    let started = Instant::now();

    let interrupted = runtime.block_on(async {
        let (stop_tx, stop_rx) = watch::channel(false);
        let printer = tokio::spawn(print_status(
            Arc::clone(&store),
            baseline,
            queued,
            config.status_interval(),
            stop_rx,
        ));

        let interrupted = tokio::select! {
            handled = pool::run_pool(ctx, queue) => {
                debug!(handled, "all workers finished");
                false
            }
            () = interrupt() => true,
        };

        let _ = stop_tx.send(true);
        if !interrupted {
            let _ = printer.await;
        }
        interrupted
    });

    if interrupted {
        println!("\n\n{}", report::INTERRUPT_MESSAGE);
        runtime.shutdown_timeout(INTERRUPT_CLEANUP);
        return Err(SweepError::Interrupted);
    }
    drop(runtime);

    println!("\n{}", report::final_summary(&store.stats(), started.elapsed()));
    Ok(())
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed.
async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

async fn print_status(
    store: Arc<ProgressStore>,
    baseline: u64,
    queued: usize,
    period: Duration,
    mut stop: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let stats = store.stats();
                if stats.total_processed.saturating_sub(baseline) < queued as u64 {
                    println!("{}", report::progress_line(&stats, baseline, queued));
                }
            }
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    break;
                }
            }
        }
    }
}
