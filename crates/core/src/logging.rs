//! Tracing initialization for the simulator.
//!
//! Two modes:
//! - **JSON mode** (`json = true`): machine-readable output with
//!   nanosecond timestamps for log aggregation.
//! - **Pretty mode** (`json = false`): human-readable colored output for
//!   local runs.
//!
//! Both respect `RUST_LOG` for filtering (e.g.
//! `RUST_LOG=velo_book=debug,velo_execution=trace`). Nothing on the hot
//! path emits tracing events; only lifecycle transitions (start, stop,
//! kill-switch trips) and drop diagnostics do.

use std::fmt;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// # Panics
///
/// Panics if the global subscriber has already been set.
pub fn init_tracing(json: bool) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    if json {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_timer(NanosecondTimer)
            .with_target(true)
            .with_thread_ids(true);
        registry.with(json_layer).init();
    } else {
        let pretty_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false);
        registry.with(pretty_layer).init();
    }
}

/// Timer that emits nanosecond-precision timestamps for JSON logs.
#[derive(Debug, Clone)]
struct NanosecondTimer;

impl tracing_subscriber::fmt::time::FormatTime for NanosecondTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> fmt::Result {
        let now = chrono::Utc::now();
        write!(w, "{}", now.format("%Y-%m-%dT%H:%M:%S%.9fZ"))
    }
}
