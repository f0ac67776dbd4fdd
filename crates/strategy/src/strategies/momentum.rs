//! Momentum strategy: fast/slow EMA crossover with volume confirmation.
//!
//! Enters when the normalized EMA gap breaks out beyond a bps threshold
//! on above-average volume; exits when the EMAs cross back.

use velo_containers::RollingWindow;
use velo_core::types::{
    ExecutionReport, InstrumentId, MarketDataMessage, OrderRequest, OrderStatus, OrderType, Price,
    Qty, Side, Timestamp, Trade,
};

use crate::traits::{OrderScratch, Strategy};

/// Momentum parameters.
#[derive(Debug, Clone)]
pub struct MomentumParams {
    /// Instrument to trade.
    pub instrument: InstrumentId,
    /// Fast EMA window length.
    pub fast_window: usize,
    /// Slow EMA window length.
    pub slow_window: usize,
    /// Breakout threshold in basis points of the slow EMA.
    pub breakout_threshold_bps: f64,
    /// Order size.
    pub order_size: Qty,
    /// Private order-id range base.
    pub base_order_id: u64,
}

impl Default for MomentumParams {
    fn default() -> Self {
        Self {
            instrument: 0,
            fast_window: 10,
            slow_window: 30,
            breakout_threshold_bps: 5.0,
            order_size: 10,
            base_order_id: 300_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrendState {
    Flat,
    Long,
    Short,
}

/// EMA crossover trend follower.
pub struct Momentum {
    params: MomentumParams,
    fast_ema: f64,
    slow_ema: f64,
    fast_alpha: f64,
    slow_alpha: f64,
    momentum_bps: f64,
    state: TrendState,
    position: i64,
    tick_count: u64,
    current_price: Price,
    volumes: RollingWindow<f64>,
    scratch: OrderScratch,
}

impl Momentum {
    /// Create a momentum strategy from parameters.
    pub fn new(params: MomentumParams) -> Self {
        let fast_alpha = 2.0 / (params.fast_window as f64 + 1.0);
        let slow_alpha = 2.0 / (params.slow_window as f64 + 1.0);
        let base_order_id = params.base_order_id;
        Self {
            params,
            fast_ema: 0.0,
            slow_ema: 0.0,
            fast_alpha,
            slow_alpha,
            momentum_bps: 0.0,
            state: TrendState::Flat,
            position: 0,
            tick_count: 0,
            current_price: Price::ZERO,
            volumes: RollingWindow::with_capacity(256),
            scratch: OrderScratch::new(base_order_id),
        }
    }

    /// Fast EMA value.
    pub fn fast_ema(&self) -> f64 {
        self.fast_ema
    }

    /// Slow EMA value.
    pub fn slow_ema(&self) -> f64 {
        self.slow_ema
    }

    /// Normalized EMA gap in basis points.
    pub fn momentum_bps(&self) -> f64 {
        self.momentum_bps
    }

    /// Net position.
    pub fn position(&self) -> i64 {
        self.position
    }

    fn update_emas(&mut self, price: f64) {
        if self.tick_count == 0 {
            self.fast_ema = price;
            self.slow_ema = price;
        } else {
            self.fast_ema = self.fast_alpha * price + (1.0 - self.fast_alpha) * self.fast_ema;
            self.slow_ema = self.slow_alpha * price + (1.0 - self.slow_alpha) * self.slow_ema;
        }
        self.tick_count += 1;

        self.momentum_bps = if self.slow_ema > 0.0 {
            (self.fast_ema - self.slow_ema) / self.slow_ema * 10_000.0
        } else {
            0.0
        };
    }

    fn avg_volume(&self) -> f64 {
        if self.volumes.is_empty() {
            return 0.0;
        }
        self.volumes.iter().sum::<f64>() / self.volumes.len() as f64
    }

    fn decide(&mut self, volume: f64, ts: Timestamp) {
        // EMA warmup: no signals until the slow window has been seen.
        if self.tick_count < self.params.slow_window as u64 {
            return;
        }

        let qty = self.params.order_size;
        match self.state {
            TrendState::Flat => {
                let volume_confirms = volume > self.avg_volume();
                if self.momentum_bps > self.params.breakout_threshold_bps && volume_confirms {
                    self.scratch.push(
                        self.params.instrument,
                        Side::Buy,
                        OrderType::Limit,
                        self.current_price,
                        qty,
                        ts,
                    );
                    self.state = TrendState::Long;
                    tracing::debug!(momentum_bps = self.momentum_bps, "momentum: breakout long");
                } else if self.momentum_bps < -self.params.breakout_threshold_bps && volume_confirms
                {
                    self.scratch.push(
                        self.params.instrument,
                        Side::Sell,
                        OrderType::Limit,
                        self.current_price,
                        qty,
                        ts,
                    );
                    self.state = TrendState::Short;
                    tracing::debug!(momentum_bps = self.momentum_bps, "momentum: breakout short");
                }
            }
            TrendState::Long => {
                if self.fast_ema < self.slow_ema {
                    self.scratch.push(
                        self.params.instrument,
                        Side::Sell,
                        OrderType::Limit,
                        self.current_price,
                        qty,
                        ts,
                    );
                    self.state = TrendState::Flat;
                }
            }
            TrendState::Short => {
                if self.fast_ema > self.slow_ema {
                    self.scratch.push(
                        self.params.instrument,
                        Side::Buy,
                        OrderType::Limit,
                        self.current_price,
                        qty,
                        ts,
                    );
                    self.state = TrendState::Flat;
                }
            }
        }
    }
}

impl Strategy for Momentum {
    fn on_market_data(&mut self, md: &MarketDataMessage) {
        // Orders are per-event: anything not drained after the previous
        // event is stale.
        self.scratch.clear();

        if md.msg_type != b'W' || md.instrument != self.params.instrument {
            return;
        }
        let mid = md.mid_price();
        if mid.is_zero() {
            return;
        }

        self.current_price = mid;
        self.update_emas(mid.to_f64());

        let volume = md.last_quantity as f64;
        self.volumes.push(volume);
        self.decide(volume, md.timestamp);
    }

    fn on_order_book_update(
        &mut self,
        _instrument: InstrumentId,
        _best_bid: Price,
        _bid_qty: Qty,
        _best_ask: Price,
        _ask_qty: Qty,
    ) {
    }

    fn on_trade(&mut self, _trade: &Trade) {}

    fn on_execution_report(&mut self, report: &ExecutionReport) {
        if report.instrument != self.params.instrument {
            return;
        }
        if matches!(
            report.status,
            OrderStatus::Filled | OrderStatus::PartiallyFilled
        ) {
            match report.side {
                Side::Buy => self.position += report.filled_quantity as i64,
                Side::Sell => self.position -= report.filled_quantity as i64,
            }
        }
    }

    fn generate_orders(&mut self) -> &[OrderRequest] {
        self.scratch.as_slice()
    }

    fn on_timer(&mut self, _now: Timestamp) {}

    fn name(&self) -> &'static str {
        "Momentum"
    }
}
