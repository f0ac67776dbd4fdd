//! Pairs-trading (statistical arbitrage) strategy.
//!
//! Tracks the spread `A − hedge_ratio · B` between two instruments,
//! computes a rolling z-score over a lookback window, and trades the
//! divergence: sell the rich leg and buy the cheap one when |z| exceeds
//! the entry threshold, flatten both legs when it falls back under the
//! exit threshold.

use velo_containers::RollingWindow;
use velo_core::types::{
    ExecutionReport, InstrumentId, MarketDataMessage, OrderRequest, OrderStatus, OrderType, Price,
    Qty, Side, Timestamp, Trade,
};

use crate::traits::{OrderScratch, Strategy};

/// Pairs-trading parameters.
#[derive(Debug, Clone)]
pub struct PairsTradingParams {
    /// First leg.
    pub instrument_a: InstrumentId,
    /// Second leg.
    pub instrument_b: InstrumentId,
    /// Units of B per unit of A in the spread.
    pub hedge_ratio: f64,
    /// Rolling window length for mean/stddev.
    pub lookback_window: usize,
    /// Entry |z| threshold.
    pub entry_z_threshold: f64,
    /// Exit |z| threshold.
    pub exit_z_threshold: f64,
    /// Per-leg order size.
    pub order_size: Qty,
    /// Private order-id range base.
    pub base_order_id: u64,
}

impl Default for PairsTradingParams {
    fn default() -> Self {
        Self {
            instrument_a: 0,
            instrument_b: 1,
            hedge_ratio: 1.0,
            lookback_window: 100,
            entry_z_threshold: 2.0,
            exit_z_threshold: 0.5,
            order_size: 10,
            base_order_id: 200_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PairState {
    Flat,
    /// Long A, short B (entered on z below -entry).
    LongSpread,
    /// Short A, long B (entered on z above +entry).
    ShortSpread,
}

/// Mean-reversion trader over a two-instrument spread.
pub struct PairsTrading {
    params: PairsTradingParams,
    price_a: Price,
    price_b: Price,
    z_score: f64,
    position_a: i64,
    position_b: i64,
    state: PairState,
    spreads: RollingWindow<f64>,
    scratch: OrderScratch,
}

impl PairsTrading {
    /// Create a pairs trader from parameters.
    pub fn new(params: PairsTradingParams) -> Self {
        let lookback = params.lookback_window.max(2);
        let base_order_id = params.base_order_id;
        Self {
            params,
            price_a: Price::ZERO,
            price_b: Price::ZERO,
            z_score: 0.0,
            position_a: 0,
            position_b: 0,
            state: PairState::Flat,
            spreads: RollingWindow::with_capacity(lookback),
            scratch: OrderScratch::new(base_order_id),
        }
    }

    /// Latest z-score of the spread.
    pub fn z_score(&self) -> f64 {
        self.z_score
    }

    /// Net position in leg A.
    pub fn position_a(&self) -> i64 {
        self.position_a
    }

    /// Net position in leg B.
    pub fn position_b(&self) -> i64 {
        self.position_b
    }

    fn update_spread(&mut self, timestamp: Timestamp) {
        if self.price_a.is_zero() || self.price_b.is_zero() {
            return;
        }

        let spread = self.price_a.to_f64() - self.params.hedge_ratio * self.price_b.to_f64();
        self.spreads.push(spread);

        if !self.spreads.is_full() {
            return;
        }

        let n = self.spreads.len() as f64;
        let mean = self.spreads.iter().sum::<f64>() / n;
        let variance = self.spreads.iter().map(|s| (s - mean) * (s - mean)).sum::<f64>() / n;
        let stddev = variance.sqrt();
        self.z_score = if stddev <= f64::EPSILON {
            0.0
        } else {
            (spread - mean) / stddev
        };

        self.decide(timestamp);
    }

    fn decide(&mut self, ts: Timestamp) {
        let qty = self.params.order_size;
        match self.state {
            PairState::Flat => {
                if self.z_score > self.params.entry_z_threshold {
                    // Spread rich: sell A, buy B.
                    self.scratch.push(
                        self.params.instrument_a,
                        Side::Sell,
                        OrderType::Limit,
                        self.price_a,
                        qty,
                        ts,
                    );
                    self.scratch.push(
                        self.params.instrument_b,
                        Side::Buy,
                        OrderType::Limit,
                        self.price_b,
                        qty,
                        ts,
                    );
                    self.state = PairState::ShortSpread;
                    tracing::debug!(z = self.z_score, "pairs: entering short spread");
                } else if self.z_score < -self.params.entry_z_threshold {
                    // Spread cheap: buy A, sell B.
                    self.scratch.push(
                        self.params.instrument_a,
                        Side::Buy,
                        OrderType::Limit,
                        self.price_a,
                        qty,
                        ts,
                    );
                    self.scratch.push(
                        self.params.instrument_b,
                        Side::Sell,
                        OrderType::Limit,
                        self.price_b,
                        qty,
                        ts,
                    );
                    self.state = PairState::LongSpread;
                    tracing::debug!(z = self.z_score, "pairs: entering long spread");
                }
            }
            PairState::ShortSpread | PairState::LongSpread => {
                if self.z_score.abs() < self.params.exit_z_threshold {
                    self.flatten(ts);
                }
            }
        }
    }

    fn flatten(&mut self, ts: Timestamp) {
        if self.position_a != 0 {
            let side = if self.position_a > 0 {
                Side::Sell
            } else {
                Side::Buy
            };
            self.scratch.push(
                self.params.instrument_a,
                side,
                OrderType::Limit,
                self.price_a,
                self.position_a.unsigned_abs(),
                ts,
            );
        }
        if self.position_b != 0 {
            let side = if self.position_b > 0 {
                Side::Sell
            } else {
                Side::Buy
            };
            self.scratch.push(
                self.params.instrument_b,
                side,
                OrderType::Limit,
                self.price_b,
                self.position_b.unsigned_abs(),
                ts,
            );
        }
        self.state = PairState::Flat;
    }
}

impl Strategy for PairsTrading {
    fn on_market_data(&mut self, md: &MarketDataMessage) {
        // Orders are per-event: anything not drained after the previous
        // event is stale.
        self.scratch.clear();

        if md.msg_type != b'W' {
            return;
        }
        let mid = md.mid_price();
        if mid.is_zero() {
            return;
        }

        if md.instrument == self.params.instrument_a {
            self.price_a = mid;
        } else if md.instrument == self.params.instrument_b {
            self.price_b = mid;
        } else {
            return;
        }

        self.update_spread(md.timestamp);
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
        if !matches!(
            report.status,
            OrderStatus::Filled | OrderStatus::PartiallyFilled
        ) {
            return;
        }
        let signed = match report.side {
            Side::Buy => report.filled_quantity as i64,
            Side::Sell => -(report.filled_quantity as i64),
        };
        if report.instrument == self.params.instrument_a {
            self.position_a += signed;
        } else if report.instrument == self.params.instrument_b {
            self.position_b += signed;
        }
    }

    fn generate_orders(&mut self) -> &[OrderRequest] {
        self.scratch.as_slice()
    }

    fn on_timer(&mut self, _now: Timestamp) {}

    fn name(&self) -> &'static str {
        "PairsTrading"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(instrument: InstrumentId, mid: i64) -> MarketDataMessage {
        MarketDataMessage {
            instrument,
            bid_price: Price::from_ticks(mid - 5),
            ask_price: Price::from_ticks(mid + 5),
            bid_quantity: 100,
            ask_quantity: 100,
            last_price: Price::from_ticks(mid),
            last_quantity: 10,
            timestamp: Timestamp(1),
            msg_type: b'W',
        }
    }

    fn params() -> PairsTradingParams {
        PairsTradingParams {
            lookback_window: 20,
            entry_z_threshold: 2.0,
            exit_z_threshold: 0.5,
            ..Default::default()
        }
    }

    /// Feed a stable spread until the window is full.
    fn warm_up(p: &mut PairsTrading) {
        for i in 0..30 {
            // Tiny alternation keeps the stddev nonzero.
            let wiggle = (i % 2) as i64;
            p.on_market_data(&snapshot(0, 15_000 + wiggle));
            p.on_market_data(&snapshot(1, 14_000));
        }
        p.scratch.clear();
    }

    #[test]
    fn test_no_signal_during_warmup() {
        let mut p = PairsTrading::new(params());
        for _ in 0..5 {
            p.on_market_data(&snapshot(0, 15_000));
            p.on_market_data(&snapshot(1, 14_000));
            assert!(p.generate_orders().is_empty());
        }
    }

    #[test]
    fn test_rich_spread_sells_a_buys_b() {
        let mut p = PairsTrading::new(params());
        warm_up(&mut p);

        // A jumps far above its historical relationship with B.
        p.on_market_data(&snapshot(0, 15_500));
        assert!(p.z_score() > 2.0, "z={}", p.z_score());

        let orders = p.generate_orders().to_vec();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].instrument, 0);
        assert_eq!(orders[0].side, Side::Sell);
        assert_eq!(orders[1].instrument, 1);
        assert_eq!(orders[1].side, Side::Buy);
    }

    #[test]
    fn test_cheap_spread_buys_a_sells_b() {
        let mut p = PairsTrading::new(params());
        warm_up(&mut p);

        p.on_market_data(&snapshot(0, 14_500));
        assert!(p.z_score() < -2.0);

        let orders = p.generate_orders().to_vec();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].side, Side::Buy);
        assert_eq!(orders[1].side, Side::Sell);
    }

    #[test]
    fn test_exit_flattens_both_legs() {
        let mut p = PairsTrading::new(params());
        warm_up(&mut p);

        p.on_market_data(&snapshot(0, 15_500));
        let entry = p.generate_orders().to_vec();
        assert_eq!(entry.len(), 2);

        // Fills arrive for both legs.
        for req in &entry {
            let mut report = ExecutionReport::rejected(req, 1, Timestamp(2));
            report.status = OrderStatus::Filled;
            report.filled_quantity = req.quantity;
            report.leaves_quantity = 0;
            p.on_execution_report(&report);
        }
        assert_eq!(p.position_a(), -10);
        assert_eq!(p.position_b(), 10);

        // Spread reverts toward the mean; enough prints to pull |z| under
        // the exit threshold.
        for _ in 0..30 {
            p.on_market_data(&snapshot(0, 15_000));
            if p.z_score().abs() < 0.5 {
                break;
            }
            p.scratch.clear();
        }
        assert!(p.z_score().abs() < 0.5, "z={}", p.z_score());

        let exits = p.generate_orders().to_vec();
        assert_eq!(exits.len(), 2);
        let exit_a = exits.iter().find(|o| o.instrument == 0).unwrap();
        let exit_b = exits.iter().find(|o| o.instrument == 1).unwrap();
        assert_eq!(exit_a.side, Side::Buy);
        assert_eq!(exit_a.quantity, 10);
        assert_eq!(exit_b.side, Side::Sell);
    }

    #[test]
    fn test_no_reentry_while_in_position() {
        let mut p = PairsTrading::new(params());
        warm_up(&mut p);

        p.on_market_data(&snapshot(0, 15_500));
        assert_eq!(p.generate_orders().len(), 2);
        p.scratch.clear();

        // Spread stays rich; no second entry while short the spread.
        p.on_market_data(&snapshot(0, 15_600));
        assert!(p.generate_orders().is_empty());
    }

    #[test]
    fn test_ignores_unrelated_instruments() {
        let mut p = PairsTrading::new(params());
        warm_up(&mut p);
        p.on_market_data(&snapshot(9, 1_000_000));
        assert!(p.generate_orders().is_empty());
        assert!(p.z_score().abs() < 2.0);
    }

    #[test]
    fn test_tolerates_reports_before_market_data() {
        let mut p = PairsTrading::new(params());
        let req = OrderRequest::new(
            5,
            0,
            Side::Buy,
            OrderType::Limit,
            Price::from_ticks(15_000),
            10,
            Timestamp(1),
        );
        let mut report = ExecutionReport::rejected(&req, 1, Timestamp(2));
        report.status = OrderStatus::Filled;
        report.filled_quantity = 10;
        p.on_execution_report(&report);
        assert_eq!(p.position_a(), 10);
        assert!(p.generate_orders().is_empty());
    }
}
