//! Velo simulator binary.
//!
//! Loads configuration, initializes tracing, installs the signal handler,
//! and runs the pipeline until the configured deadline or Ctrl-C.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;

use velo_core::config::SimConfig;

/// Ultra-low-latency trading pipeline simulator.
#[derive(Parser, Debug)]
#[command(name = "velo-sim", about = "Velo trading pipeline simulator")]
struct Args {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write per-stage latency percentiles to this CSV file.
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Emit JSON logs instead of human-readable output.
    #[arg(long)]
    json_logs: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = SimConfig::load(args.config)?;

    velo_core::logging::init_tracing(args.json_logs);

    tracing::info!(
        duration_ms = config.simulation_duration_ms,
        instruments = config.num_instruments,
        venues = config.num_exchanges,
        "starting velo-sim"
    );

    // SIGINT/SIGTERM flip the stop flag; the orchestrator finishes its
    // current iteration and shuts the stages down.
    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        stop_handler.store(true, Ordering::Relaxed);
    })?;

    let summary = velo_sim::Pipeline::new(config)?.run(stop, args.csv.as_deref())?;

    tracing::info!(
        iterations = summary.iterations,
        orders_sent = summary.orders_sent,
        fills = summary.fills,
        "simulation complete"
    );

    Ok(())
}
