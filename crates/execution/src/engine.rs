//! Execution engine: the order-consuming pipeline stage.
//!
//! Consumes [`OrderRequest`]s from the order SPSC queue, applies a
//! one-second-window rate limit, dispatches through the [`Router`], and
//! pushes the resulting [`ExecutionReport`] onto the report queue. Runs
//! on a dedicated thread pinned to a configured core; `start` is
//! idempotent via an atomic exchange and `stop` joins the thread after it
//! drains the input queue once, so in-flight requests are not lost at
//! shutdown.
//!
//! If the output queue is full the report is dropped — acceptable under
//! the simulator's at-most-once semantics.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use velo_containers::{Consumer, Producer};
use velo_core::thread::pin_to_core;
use velo_core::types::{ExecutionReport, OrderRequest, Price, Qty, Timestamp};

use crate::router::Router;

const ONE_SECOND_NS: u64 = 1_000_000_000;

/// Everything the engine thread owns while running.
struct EngineCore {
    router: Router,
    input: Consumer<OrderRequest>,
    output: Producer<ExecutionReport>,

    max_orders_per_sec: u32,
    rate_window_start: Timestamp,
    orders_in_window: u32,

    orders_processed: u64,
    orders_throttled: u64,
    reports_dropped: u64,
}

impl EngineCore {
    /// Rate-check then route one request, producing exactly one report.
    fn process_order(&mut self, request: &OrderRequest, now: Timestamp) -> ExecutionReport {
        if !self.check_rate_limit(now) {
            self.orders_throttled += 1;
            return ExecutionReport::rejected(request, 0, now);
        }

        self.orders_processed += 1;
        self.router.route_order(request)
    }

    fn check_rate_limit(&mut self, now: Timestamp) -> bool {
        if now.elapsed_since(self.rate_window_start) >= ONE_SECOND_NS {
            self.rate_window_start = now;
            self.orders_in_window = 0;
        }
        if self.orders_in_window >= self.max_orders_per_sec {
            return false;
        }
        self.orders_in_window += 1;
        true
    }

    fn pop_and_process(&mut self) -> bool {
        match self.input.try_pop() {
            Some(request) => {
                let report = self.process_order(&request, Timestamp::now());
                if !self.output.try_push(report) {
                    self.reports_dropped += 1;
                }
                true
            }
            None => false,
        }
    }
}

/// The execution stage: owns its venues (via the router) and its thread.
pub struct ExecutionEngine {
    core: Option<EngineCore>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<EngineCore>>,
}

impl ExecutionEngine {
    /// Create an engine around a router and its two queue endpoints.
    pub fn new(
        router: Router,
        input: Consumer<OrderRequest>,
        output: Producer<ExecutionReport>,
        max_orders_per_sec: u32,
    ) -> Self {
        Self {
            core: Some(EngineCore {
                router,
                input,
                output,
                max_orders_per_sec,
                rate_window_start: Timestamp::now(),
                orders_in_window: 0,
                orders_processed: 0,
                orders_throttled: 0,
                reports_dropped: 0,
            }),
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Seed every venue's book around `mid_price`.
    ///
    /// # Panics
    ///
    /// Panics if called while the engine is running.
    pub fn seed_books(&mut self, mid_price: Price, levels: u32, qty_per_level: Qty) {
        let core = self.core.as_mut().expect("engine is running");
        for venue in core.router.venues_mut() {
            venue.seed_book(mid_price, levels, qty_per_level);
        }
    }

    /// Start the engine thread pinned to `core_id`. Idempotent: a second
    /// call while running is a no-op.
    pub fn start(&mut self, core_id: usize) {
        if self.running.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut core = self.core.take().expect("engine core present when stopped");
        let running = Arc::clone(&self.running);

        self.handle = Some(
            std::thread::Builder::new()
                .name("velo-execution".to_string())
                .spawn(move || {
                    pin_to_core(core_id);
                    tracing::info!(core_id, "execution engine started");

                    while running.load(Ordering::Relaxed) {
                        if !core.pop_and_process() {
                            std::hint::spin_loop();
                        }
                    }

                    // Drain once so shutdown does not lose in-flight requests.
                    while core.pop_and_process() {}

                    tracing::info!(
                        processed = core.orders_processed,
                        throttled = core.orders_throttled,
                        "execution engine stopped"
                    );
                    core
                })
                .expect("spawn execution engine thread"),
        );
    }

    /// Stop the engine thread and reclaim its state. Calling `stop` on an
    /// engine that was never started is a no-op.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(core) => self.core = Some(core),
                Err(_) => tracing::error!("execution engine thread panicked"),
            }
        }
    }

    /// Process one request synchronously (single-threaded mode / tests).
    ///
    /// # Panics
    ///
    /// Panics if called while the engine thread is running.
    pub fn process_order(&mut self, request: &OrderRequest) -> ExecutionReport {
        let core = self.core.as_mut().expect("engine is running");
        core.process_order(request, Timestamp::now())
    }

    /// [`process_order`](Self::process_order) with an explicit clock, for
    /// deterministic rate-limit tests.
    pub fn process_order_at(&mut self, request: &OrderRequest, now: Timestamp) -> ExecutionReport {
        let core = self.core.as_mut().expect("engine is running");
        core.process_order(request, now)
    }

    /// Orders processed (past the rate limiter).
    pub fn orders_processed(&self) -> u64 {
        self.core.as_ref().map_or(0, |c| c.orders_processed)
    }

    /// Orders rejected by the rate limiter.
    pub fn orders_throttled(&self) -> u64 {
        self.core.as_ref().map_or(0, |c| c.orders_throttled)
    }

    /// Reports dropped because the output queue was full.
    pub fn reports_dropped(&self) -> u64 {
        self.core.as_ref().map_or(0, |c| c.reports_dropped)
    }

    /// Router access while stopped (venue stats, seeding).
    pub fn router(&self) -> Option<&Router> {
        self.core.as_ref().map(|c| &c.router)
    }
}

impl Drop for ExecutionEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
