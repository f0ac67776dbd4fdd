//! Pipeline harness: queue construction, stage threads, the orchestrator
//! loop, and shutdown.
//!
//! Three stages run in parallel, each pinned to a configured core:
//!
//! - **market data**: feed generation + FIX parse, pushing normalized
//!   messages onto the market-data queue;
//! - **strategy/risk** (the orchestrator thread): consumes market data,
//!   dispatches strategy callbacks, gates generated orders through the
//!   risk gate, pushes approved requests onto the order queue, and applies
//!   execution reports to positions;
//! - **execution**: the engine thread inside
//!   [`ExecutionEngine`], consuming requests and producing reports.
//!
//! Shutdown is cooperative: the stop flag (set by the signal handler or
//! the simulation deadline) ends each loop, the engine drains its input
//! once, and the orchestrator drains remaining reports before printing
//! the final report.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};

use velo_containers::{spsc_ring, Consumer};
use velo_core::config::SimConfig;
use velo_core::thread::{pin_to_core, set_realtime_priority};
use velo_core::types::{
    ExecutionReport, MarketDataMessage, OrderStatus, Price, Timestamp,
};
use velo_execution::{ExecutionEngine, Router, RoutingStrategy, VenueSimulator};
use velo_feed::{FeedSimulator, MarketDataHandler};
use velo_metrics::MetricsCollector;
use velo_risk::RiskGate;
use velo_strategy::{
    MarketMaker, MarketMakerParams, Momentum, MomentumParams, PairsTrading, PairsTradingParams,
    Strategy,
};

/// Symbols the feed can simulate; instrument ids map positionally.
const SYMBOLS: [&str; 5] = ["AAPL", "GOOG", "MSFT", "AMZN", "TSLA"];

/// Book depth seeded into every venue at startup.
const SEED_LEVELS: u32 = 10;
const SEED_QTY_PER_LEVEL: u64 = 1_000;

/// Final state of a simulation run, for callers that want to assert on it.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub iterations: u64,
    pub elapsed_seconds: f64,
    pub md_messages_processed: u64,
    pub md_messages_dropped: u64,
    pub orders_sent: u64,
    pub orders_throttled: u64,
    pub fills: u64,
    pub risk_checks_performed: u64,
    pub risk_checks_rejected: u64,
    pub realized_pnl: f64,
    pub total_pnl: f64,
    pub kill_switch_active: bool,
    pub positions: Vec<(u32, i64)>,
}

/// The assembled pipeline, ready to run once.
pub struct Pipeline {
    config: SimConfig,
}

impl Pipeline {
    /// Validate the configuration and build a pipeline.
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Run the simulation until the deadline or until `stop` is raised.
    ///
    /// Prints the throughput/latency summary and the tick-to-trade
    /// histogram at the end; optionally dumps per-stage percentiles as
    /// CSV.
    pub fn run(self, stop: Arc<AtomicBool>, csv_path: Option<&Path>) -> Result<RunSummary> {
        let cfg = self.config;

        // ── Queues ─────────────────────────────────────────────────────
        let (md_tx, mut md_rx) = spsc_ring::<MarketDataMessage>(cfg.market_data_queue_size);
        let (mut order_tx, order_rx) = spsc_ring(cfg.order_queue_size);
        let (report_tx, mut report_rx) =
            spsc_ring::<ExecutionReport>(cfg.execution_report_queue_size);

        // ── Feed + handler (market-data stage) ─────────────────────────
        let mut feed = FeedSimulator::new();
        let num_instruments = (cfg.num_instruments as usize).min(SYMBOLS.len());
        if num_instruments < cfg.num_instruments as usize {
            tracing::warn!(
                requested = cfg.num_instruments,
                simulated = num_instruments,
                "instrument count clamped to the known symbol set"
            );
        }
        for (i, symbol) in SYMBOLS.iter().take(num_instruments).enumerate() {
            // Stagger price and volatility a little per instrument.
            let price = cfg.initial_price * (1.0 + i as f64 * 0.85);
            let volatility = cfg.volatility * (1.0 + i as f64 * 0.2);
            feed.add_instrument(i as u32, symbol, price, volatility, 0.02, 100);
        }
        let mut handler = MarketDataHandler::new(md_tx);

        // ── Risk gate ──────────────────────────────────────────────────
        let mut gate = RiskGate::new(cfg.risk_limits.clone());

        // ── Strategies ─────────────────────────────────────────────────
        let mut strategies: Vec<Box<dyn Strategy>> = vec![
            Box::new(MarketMaker::new(MarketMakerParams {
                base_spread_bps: cfg.strategy.market_maker_spread_bps,
                max_inventory: cfg.strategy.market_maker_max_inventory,
                order_size: cfg.strategy.market_maker_order_size,
                instrument: 0,
                ..Default::default()
            })),
            Box::new(Momentum::new(MomentumParams {
                instrument: 0,
                fast_window: cfg.strategy.momentum_fast_window,
                slow_window: cfg.strategy.momentum_slow_window,
                breakout_threshold_bps: cfg.strategy.momentum_breakout_bps,
                ..Default::default()
            })),
        ];
        if num_instruments >= 2 {
            strategies.push(Box::new(PairsTrading::new(PairsTradingParams {
                instrument_a: 0,
                instrument_b: 1,
                lookback_window: cfg.strategy.pairs_lookback_window,
                entry_z_threshold: cfg.strategy.pairs_entry_z,
                exit_z_threshold: cfg.strategy.pairs_exit_z,
                ..Default::default()
            })));
        }

        // ── Execution engine + venues ──────────────────────────────────
        let mut router = Router::new(RoutingStrategy::RoundRobin);
        for exchange in cfg.exchanges.iter().take(cfg.num_exchanges) {
            router.add_venue(VenueSimulator::new(exchange.clone()));
        }
        let mut engine = ExecutionEngine::new(
            router,
            order_rx,
            report_tx,
            cfg.risk_limits.max_orders_per_second,
        );
        engine.seed_books(
            Price::from_f64(cfg.initial_price),
            SEED_LEVELS,
            SEED_QTY_PER_LEVEL,
        );

        let mut metrics = MetricsCollector::new();

        tracing::info!(
            instruments = num_instruments,
            venues = cfg.num_exchanges,
            strategies = strategies.len(),
            duration_ms = cfg.simulation_duration_ms,
            "pipeline assembled, starting stages"
        );

        // ── Start stage threads ────────────────────────────────────────
        let deadline = Timestamp::now() + cfg.simulation_duration_ms * 1_000_000;
        let start_instant = Instant::now();

        engine.start(cfg.execution_core);

        let md_stop = Arc::clone(&stop);
        let md_core = cfg.market_data_core;
        let feed_interval_ns = if cfg.feed_rate_msgs_per_sec > 0.0 {
            (1_000_000_000.0 / cfg.feed_rate_msgs_per_sec) as u64
        } else {
            0
        };
        let md_thread = std::thread::Builder::new()
            .name("velo-market-data".to_string())
            .spawn(move || {
                pin_to_core(md_core);
                if !set_realtime_priority(10) {
                    tracing::debug!("running market data stage without SCHED_FIFO");
                }

                let mut next_emit = Timestamp::now();
                while !md_stop.load(Ordering::Relaxed) {
                    let now = Timestamp::now();
                    if now >= deadline {
                        break;
                    }
                    if now < next_emit {
                        std::hint::spin_loop();
                        continue;
                    }
                    next_emit = now + feed_interval_ns;

                    let raw = feed.next_message();
                    if !raw.is_empty() {
                        handler.process_message(raw);
                    }
                }
                (feed, handler)
            })
            .context("spawn market data thread")?;

        // ── Orchestrator loop (strategy + risk stage) ──────────────────
        pin_to_core(cfg.strategy_core);

        let mut iterations = 0u64;
        loop {
            if stop.load(Ordering::Relaxed) {
                break;
            }
            let loop_start = Timestamp::now();
            if loop_start >= deadline {
                stop.store(true, Ordering::Relaxed);
                break;
            }

            // 1. Consume one market-data event.
            if let Some(md) = md_rx.try_pop() {
                metrics.record_market_data_msg();
                metrics
                    .market_data_latency()
                    .record(loop_start.elapsed_since(md.timestamp));

                let market_price = md.mid_price();

                // 2. Strategy callbacks.
                let t_strategy = Timestamp::now();
                if md.msg_type == b'W' {
                    let t_book = Timestamp::now();
                    for strategy in strategies.iter_mut() {
                        strategy.on_order_book_update(
                            md.instrument,
                            md.bid_price,
                            md.bid_quantity,
                            md.ask_price,
                            md.ask_quantity,
                        );
                    }
                    metrics.record_order_book_update();
                    metrics
                        .order_book_latency()
                        .record(Timestamp::now().elapsed_since(t_book));
                }
                for strategy in strategies.iter_mut() {
                    strategy.on_market_data(&md);
                }

                // 3. Gate and forward generated orders.
                for strategy in strategies.iter_mut() {
                    for request in strategy.generate_orders().iter() {
                        let t_risk = Timestamp::now();
                        let verdict = gate.check_order(request, market_price);
                        metrics
                            .risk_check_latency()
                            .record(Timestamp::now().elapsed_since(t_risk));

                        if verdict.is_ok() && order_tx.try_push(*request) {
                            metrics.record_order_sent();
                        }
                    }
                }
                metrics
                    .strategy_latency()
                    .record(Timestamp::now().elapsed_since(t_strategy));

                metrics.record_tick_to_trade(Timestamp::now().elapsed_since(md.timestamp));
            }

            // 4. Apply execution reports.
            drain_reports(
                &mut report_rx,
                &mut strategies,
                &mut gate,
                &mut metrics,
            );

            iterations += 1;
        }

        // ── Shutdown ───────────────────────────────────────────────────
        stop.store(true, Ordering::Relaxed);
        engine.stop();
        let (feed, handler) = md_thread.join().expect("market data thread panicked");

        // One final drain so late reports still reach the books.
        drain_reports(&mut report_rx, &mut strategies, &mut gate, &mut metrics);

        let elapsed = start_instant.elapsed().as_secs_f64();

        // ── Report ─────────────────────────────────────────────────────
        metrics.print_summary(elapsed);

        println!("\n--- Position Summary ---");
        let mut positions = Vec::new();
        for i in 0..num_instruments as u32 {
            let pos = gate.position_tracker().position(i);
            positions.push((i, pos));
            println!("  {:<6} position: {}", SYMBOLS[i as usize], pos);
        }
        println!(
            "  Realized P&L:  ${:.2}",
            gate.position_tracker().realized_pnl()
        );
        println!("  Total P&L:     ${:.2}", gate.position_tracker().total_pnl());
        println!("\n  Iterations: {iterations}");
        println!(
            "  Feed: {} generated, {} parsed, {} dropped",
            feed.messages_generated(),
            handler.messages_processed(),
            handler.messages_dropped()
        );
        println!(
            "  Risk checks: {} (rejected: {})",
            gate.checks_performed(),
            gate.checks_rejected()
        );
        println!(
            "  Execution: {} processed, {} throttled",
            engine.orders_processed(),
            engine.orders_throttled()
        );
        if gate.kill_switch_active() {
            println!("  WARNING: kill switch was activated!");
        }

        if let Some(path) = csv_path {
            metrics
                .dump_csv(path)
                .with_context(|| format!("writing CSV to {}", path.display()))?;
            println!("  Latency CSV written to {}", path.display());
        }

        Ok(RunSummary {
            iterations,
            elapsed_seconds: elapsed,
            md_messages_processed: handler.messages_processed(),
            md_messages_dropped: handler.messages_dropped(),
            orders_sent: metrics.orders_sent(),
            orders_throttled: engine.orders_throttled(),
            fills: metrics.fills(),
            risk_checks_performed: gate.checks_performed(),
            risk_checks_rejected: gate.checks_rejected(),
            realized_pnl: gate.position_tracker().realized_pnl(),
            total_pnl: gate.position_tracker().total_pnl(),
            kill_switch_active: gate.kill_switch_active(),
            positions,
        })
    }
}

/// Apply queued execution reports: notify strategies, update positions
/// and mark prices, and feed the drawdown monitor.
fn drain_reports(
    report_rx: &mut Consumer<ExecutionReport>,
    strategies: &mut [Box<dyn Strategy>],
    gate: &mut RiskGate,
    metrics: &mut MetricsCollector,
) {
    while let Some(report) = report_rx.try_pop() {
        let t_pop = Timestamp::now();
        metrics
            .execution_latency()
            .record(t_pop.elapsed_since(report.timestamp));

        for strategy in strategies.iter_mut() {
            strategy.on_execution_report(&report);
        }

        if matches!(
            report.status,
            OrderStatus::Filled | OrderStatus::PartiallyFilled
        ) {
            gate.position_tracker_mut().on_fill(
                report.instrument,
                report.side,
                report.filled_quantity,
                report.price,
            );
            metrics.record_fill();
        }

        if report.price.ticks() > 0 {
            gate.position_tracker_mut()
                .update_mark_price(report.instrument, report.price);
        }

        let total_pnl = gate.position_tracker().total_pnl();
        gate.on_pnl_update(total_pnl);
    }
}
