//! The pre-trade risk gate.
//!
//! [`RiskGate::check_order`] runs six checks in a fixed order — kill
//! switch, order size, position limits, capital, order rate, fat finger —
//! and the first failure returns without running the rest. The order is
//! deliberate (cheapest checks first) and observable: when several limits
//! would fail at once, the earliest check names the rejection.
//!
//! The gate never allocates; thresholds are precomputed at configuration
//! time and the fat-finger comparison is multiplication-only. The rate
//! counter is incremented before the rate comparison, so a rejected
//! order still consumes rate budget.

use std::sync::Arc;

use velo_core::config::RiskLimits;
use velo_core::types::{OrderRequest, Price, Qty, Side, Timestamp};

use crate::kill_switch::KillSwitch;
use crate::position::PositionTracker;

const ONE_SECOND_NS: u64 = 1_000_000_000;

/// Reason an order was rejected by the gate, one variant per check.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RiskReject {
    /// The kill switch is active; all orders are rejected.
    #[error("kill switch active")]
    KillSwitchActive,
    /// Single order quantity exceeds the configured limit.
    #[error("order size too large: {quantity} > {limit}")]
    OrderSizeTooLarge { quantity: Qty, limit: Qty },
    /// Projected per-instrument or aggregate position exceeds its limit.
    #[error("position limit breached: projected {projected}, limit {limit}")]
    PositionLimitBreached { projected: i64, limit: i64 },
    /// Projected capital usage exceeds the configured maximum.
    #[error("capital limit breached: {required:.2} > {limit:.2}")]
    CapitalLimitBreached { required: f64, limit: f64 },
    /// Too many orders in the sliding one-second window.
    #[error("order rate exceeded: {count} > {limit} orders/sec")]
    OrderRateExceeded { count: u32, limit: u32 },
    /// Order price deviates too far from the market price.
    #[error("fat finger: price {price} vs market {market}")]
    FatFingerPrice { price: Price, market: Price },
}

/// Six-check pre-trade gate with kill switch and drawdown monitor.
pub struct RiskGate {
    limits: RiskLimits,
    positions: PositionTracker,
    kill_switch: Arc<KillSwitch>,

    // Precomputed fractions so the hot path never divides.
    price_deviation_threshold: f64,
    max_drawdown_threshold: f64,

    // Sliding one-second rate window.
    rate_window_start: Timestamp,
    orders_in_window: u32,

    // Drawdown monitor; the peak ratchets upward only.
    peak_pnl: f64,

    checks_performed: u64,
    checks_rejected: u64,
}

impl RiskGate {
    /// Create a gate with the given limits and a fresh kill switch.
    pub fn new(limits: RiskLimits) -> Self {
        let price_deviation_threshold = limits.max_price_deviation_pct / 100.0;
        let max_drawdown_threshold = limits.max_drawdown_pct / 100.0;
        Self {
            limits,
            positions: PositionTracker::new(),
            kill_switch: Arc::new(KillSwitch::new()),
            price_deviation_threshold,
            max_drawdown_threshold,
            rate_window_start: Timestamp::now(),
            orders_in_window: 0,
            peak_pnl: 0.0,
            checks_performed: 0,
            checks_rejected: 0,
        }
    }

    /// Run all six checks against `request`.
    ///
    /// `market_price` is the current market price used by the fat-finger
    /// check; a zero market price skips that check.
    #[inline]
    pub fn check_order(
        &mut self,
        request: &OrderRequest,
        market_price: Price,
    ) -> Result<(), RiskReject> {
        self.check_order_at(request, market_price, Timestamp::now())
    }

    /// [`check_order`](Self::check_order) with an explicit clock reading,
    /// for deterministic rate-window tests.
    pub fn check_order_at(
        &mut self,
        request: &OrderRequest,
        market_price: Price,
        now: Timestamp,
    ) -> Result<(), RiskReject> {
        self.checks_performed += 1;

        // 1. Kill switch.
        if self.kill_switch.is_active() {
            self.checks_rejected += 1;
            return Err(RiskReject::KillSwitchActive);
        }

        // 2. Order size: single comparison.
        if request.quantity > self.limits.max_order_size {
            self.checks_rejected += 1;
            return Err(RiskReject::OrderSizeTooLarge {
                quantity: request.quantity,
                limit: self.limits.max_order_size,
            });
        }

        // 3. Position limits: per-instrument, then aggregate.
        let current = self.positions.position(request.instrument);
        let signed_qty = request.quantity as i64;
        let projected = match request.side {
            Side::Buy => current + signed_qty,
            Side::Sell => current - signed_qty,
        };
        if projected.abs() > self.limits.max_position_per_instrument {
            self.checks_rejected += 1;
            return Err(RiskReject::PositionLimitBreached {
                projected: projected.abs(),
                limit: self.limits.max_position_per_instrument,
            });
        }
        let total = self.positions.total_absolute_position();
        let delta = projected.abs() - current.abs();
        if total + delta > self.limits.max_total_position {
            self.checks_rejected += 1;
            return Err(RiskReject::PositionLimitBreached {
                projected: total + delta,
                limit: self.limits.max_total_position,
            });
        }

        // 4. Capital.
        let capital = self.positions.capital_used();
        let order_value = request.quantity as f64 * request.price.to_f64();
        if capital + order_value > self.limits.max_capital {
            self.checks_rejected += 1;
            return Err(RiskReject::CapitalLimitBreached {
                required: capital + order_value,
                limit: self.limits.max_capital,
            });
        }

        // 5. Order rate: sliding one-second window. Pre-increment — a
        // rejected order still consumes rate budget.
        if now.elapsed_since(self.rate_window_start) >= ONE_SECOND_NS {
            self.rate_window_start = now;
            self.orders_in_window = 0;
        }
        self.orders_in_window += 1;
        if self.orders_in_window > self.limits.max_orders_per_second {
            self.checks_rejected += 1;
            return Err(RiskReject::OrderRateExceeded {
                count: self.orders_in_window,
                limit: self.limits.max_orders_per_second,
            });
        }

        // 6. Fat finger: |price - market| > market * threshold, skipped
        // when no market price is known.
        if market_price.ticks() > 0 {
            let diff = (request.price - market_price).abs().ticks() as f64;
            let market = market_price.ticks() as f64;
            if diff > market * self.price_deviation_threshold {
                self.checks_rejected += 1;
                return Err(RiskReject::FatFingerPrice {
                    price: request.price,
                    market: market_price,
                });
            }
        }

        Ok(())
    }

    /// Feed the latest total P&L into the drawdown monitor. The running
    /// peak ratchets upward only; once positive, a drawdown exceeding
    /// `max_drawdown_pct` activates the kill switch.
    pub fn on_pnl_update(&mut self, total_pnl: f64) {
        if total_pnl > self.peak_pnl {
            self.peak_pnl = total_pnl;
        }

        if self.peak_pnl > 0.0 {
            let drawdown = (self.peak_pnl - total_pnl) / self.peak_pnl;
            if drawdown > self.max_drawdown_threshold && !self.kill_switch.is_active() {
                self.kill_switch.activate("max drawdown exceeded");
            }
        }
    }

    /// Activate the kill switch directly.
    pub fn activate_kill_switch(&self, reason: &str) {
        self.kill_switch.activate(reason);
    }

    /// Deactivate the kill switch.
    pub fn deactivate_kill_switch(&self) {
        self.kill_switch.deactivate();
    }

    /// Returns `true` if the kill switch is active.
    pub fn kill_switch_active(&self) -> bool {
        self.kill_switch.is_active()
    }

    /// Shareable handle to the kill switch for other threads.
    pub fn kill_switch_handle(&self) -> Arc<KillSwitch> {
        Arc::clone(&self.kill_switch)
    }

    /// The position tracker the checks read from.
    pub fn position_tracker(&self) -> &PositionTracker {
        &self.positions
    }

    /// Mutable access for the thread consuming execution reports.
    pub fn position_tracker_mut(&mut self) -> &mut PositionTracker {
        &mut self.positions
    }

    /// Current limits.
    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    /// Replace the limits, recomputing the precomputed thresholds.
    pub fn set_limits(&mut self, limits: RiskLimits) {
        self.price_deviation_threshold = limits.max_price_deviation_pct / 100.0;
        self.max_drawdown_threshold = limits.max_drawdown_pct / 100.0;
        self.limits = limits;
    }

    /// Reset the rate window (testing and reporting).
    pub fn reset_rate_counter(&mut self) {
        self.orders_in_window = 0;
        self.rate_window_start = Timestamp::now();
    }

    /// Total checks run.
    pub fn checks_performed(&self) -> u64 {
        self.checks_performed
    }

    /// Total rejections.
    pub fn checks_rejected(&self) -> u64 {
        self.checks_rejected
    }

    /// Running P&L peak seen by the drawdown monitor.
    pub fn peak_pnl(&self) -> f64 {
        self.peak_pnl
    }
}
