//! Tracing setup for reqsweep
//!
//! Diagnostics go to stderr through `tracing`; the human-facing progress
//! reports stay on stdout so they can be piped or tailed separately.

use std::io::IsTerminal;
use tracing::Span;
use tracing::info_span;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Colored output only when stderr is a TTY and `NO_COLOR` is unset.
fn use_color() -> bool {
    std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// Default filter directive when `RUST_LOG` is not set.
#[must_use]
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "reqsweep=debug,reqsweep_runner=debug,info"
    } else {
        "reqsweep=info,reqsweep_runner=info,warn"
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `verbose`. Calling this twice returns an error
/// instead of panicking, so tests can call it freely.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(verbose)))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(use_color())
                .with_target(verbose)
                .with_thread_ids(false)
                .with_line_number(false)
                .with_file(false)
                .compact(),
        )
        .try_init()?;

    Ok(())
}

/// Span wrapping all log lines for one unit of work.
#[must_use]
pub fn unit_span(worker: usize, unit: &str) -> Span {
    info_span!("unit", worker, unit = %unit)
}
