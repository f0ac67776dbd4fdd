//! # velo-metrics
//!
//! Observability for the simulator, kept off the hot path: recording a
//! sample is a ring-buffer push or a bucket increment; percentile math
//! and report formatting happen only at shutdown.

pub mod collector;
pub mod histogram;
pub mod latency;

pub use collector::MetricsCollector;
pub use histogram::LatencyHistogram;
pub use latency::{LatencyStats, LatencyTracker};
