//! User-facing text for status, progress and summaries
//!
//! Everything here returns a `String`; printing is the CLI's job.

use crate::progress::AggregateStats;
use camino::Utf8Path;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::time::Duration;

pub const INTERRUPT_MESSAGE: &str = "⚠ Gracefully shutting down... Progress has been saved.\n  Run again to continue from where you left off.";

fn write_counts(out: &mut String, stats: &AggregateStats) {
    let _ = writeln!(out, "  Total processed: {}", stats.total_processed);
    let _ = writeln!(out, "  Success: {}", stats.total_success);
    let _ = writeln!(out, "  Failed: {}", stats.total_failed);
    let _ = writeln!(out, "  Skipped: {}", stats.total_skipped);
}

fn write_histogram(out: &mut String, stats: &AggregateStats) {
    let platforms = stats.sorted_platforms();
    if platforms.is_empty() {
        return;
    }
    let _ = writeln!(out, "\nDetected platforms:");
    for (platform, count) in platforms {
        let _ = writeln!(out, "  {platform}: {count} projects");
    }
}

/// `--status` output.
#[must_use]
pub fn status_report(stats: &AggregateStats, progress_file: &Utf8Path) -> String {
    let mut out = String::from("=== Progress Status ===\n");
    write_counts(&mut out, stats);
    write_histogram(&mut out, stats);
    let _ = write!(out, "\nProgress file: {progress_file}");
    out
}

/// Banner printed when a run continues earlier work.
#[must_use]
pub fn resume_banner(stats: &AggregateStats) -> String {
    format!(
        "Found existing progress: {} projects already processed.\nContinuing from where we left off...",
        stats.total_processed
    )
}

/// Queue size, worker count and the declared-platform preview.
#[must_use]
pub fn run_banner(queued: usize, workers: usize, declared: &BTreeMap<String, usize>) -> String {
    let mut out = format!("Found {queued} projects to process");
    if !declared.is_empty() {
        let _ = write!(out, "\nDeclared platforms:");
        let mut entries: Vec<(&String, &usize)> = declared.iter().collect();
        entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (platform, count) in entries {
            let _ = write!(out, "\n  {platform}: {count}");
        }
    }
    let _ = write!(out, "\nStarting {workers} workers...");
    out
}

/// Live one-line progress for this run.
///
/// `baseline` is the processed count before the run started.
#[must_use]
pub fn progress_line(stats: &AggregateStats, baseline: u64, queued: usize) -> String {
    let done = stats.total_processed.saturating_sub(baseline);
    let remaining = (queued as u64).saturating_sub(done);
    format!(
        "Progress: {done}/{queued} | Success: {} | Failed: {} | Skipped: {} | Remaining: {remaining}",
        stats.total_success, stats.total_failed, stats.total_skipped
    )
}

/// Report after the pool drains.
#[must_use]
pub fn final_summary(stats: &AggregateStats, elapsed: Duration) -> String {
    let mut out = String::from("=== Run Complete ===\n");
    write_counts(&mut out, stats);
    write_histogram(&mut out, stats);
    let _ = write!(out, "\nElapsed: {}", format_duration(elapsed));
    out
}

/// `1h 02m 03s`, `4m 05s` or `6.2s`.
#[must_use]
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    match (secs / 3600, (secs % 3600) / 60, secs % 60) {
        (0, 0, _) => format!("{:.1}s", d.as_secs_f64()),
        (0, m, s) => format!("{m}m {s:02}s"),
        (h, m, s) => format!("{h}h {m:02}m {s:02}s"),
    }
}
