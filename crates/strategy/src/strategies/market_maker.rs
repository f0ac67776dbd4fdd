//! Market-making strategy.
//!
//! Quotes symmetric bid/ask around a fair value, widening the spread
//! with rolling volatility and skewing quotes against accumulated
//! inventory. At the inventory limit only the flattening side is quoted.

use velo_containers::RollingWindow;
use velo_core::types::{
    ExecutionReport, InstrumentId, MarketDataMessage, OrderRequest, OrderStatus, OrderType, Price,
    Qty, Side, Timestamp, Trade,
};

use crate::traits::{OrderScratch, Strategy};

/// Market maker parameters.
#[derive(Debug, Clone)]
pub struct MarketMakerParams {
    /// Base half-spread-pair width in basis points.
    pub base_spread_bps: f64,
    /// Maximum absolute inventory before one-sided quoting.
    pub max_inventory: i64,
    /// Quote size.
    pub order_size: Qty,
    /// Inventory skew aggressiveness in [0, 1].
    pub skew_factor: f64,
    /// Rolling window length for the volatility estimate.
    pub volatility_window: usize,
    /// Instrument to quote.
    pub instrument: InstrumentId,
    /// Private order-id range base.
    pub base_order_id: u64,
}

impl Default for MarketMakerParams {
    fn default() -> Self {
        Self {
            base_spread_bps: 10.0,
            max_inventory: 100,
            order_size: 10,
            skew_factor: 0.5,
            volatility_window: 100,
            instrument: 0,
            base_order_id: 100_000,
        }
    }
}

/// Inventory-aware symmetric quoter.
pub struct MarketMaker {
    params: MarketMakerParams,
    inventory: i64,
    best_bid: Price,
    best_ask: Price,
    has_bbo: bool,
    current_spread_bps: f64,
    mid_prices: RollingWindow<f64>,
    last_timestamp: Timestamp,
    scratch: OrderScratch,
}

impl MarketMaker {
    /// Create a market maker from parameters.
    pub fn new(params: MarketMakerParams) -> Self {
        let window = params.volatility_window.max(2);
        let base_order_id = params.base_order_id;
        Self {
            current_spread_bps: params.base_spread_bps,
            params,
            inventory: 0,
            best_bid: Price::ZERO,
            best_ask: Price::ZERO,
            has_bbo: false,
            mid_prices: RollingWindow::with_capacity(window),
            last_timestamp: Timestamp(0),
            scratch: OrderScratch::new(base_order_id),
        }
    }

    /// Current signed inventory.
    pub fn inventory(&self) -> i64 {
        self.inventory
    }

    /// Spread currently quoted, in basis points.
    pub fn current_spread_bps(&self) -> f64 {
        self.current_spread_bps
    }

    fn fair_value(&self) -> f64 {
        (self.best_bid.to_f64() + self.best_ask.to_f64()) / 2.0
    }

    /// Widen the base spread by the rolling stddev of mid returns.
    fn compute_dynamic_spread(&mut self) {
        let n = self.mid_prices.len();
        if n < 2 {
            self.current_spread_bps = self.params.base_spread_bps;
            return;
        }

        let mut sum = 0.0;
        let mut count = 0.0;
        let mut prev = self.mid_prices.front().unwrap_or(0.0);
        let mut returns_sq = 0.0;
        for mid in self.mid_prices.iter().skip(1) {
            if prev > 0.0 {
                let r = (mid - prev) / prev;
                sum += r;
                returns_sq += r * r;
                count += 1.0;
            }
            prev = mid;
        }
        if count < 1.0 {
            self.current_spread_bps = self.params.base_spread_bps;
            return;
        }

        let mean = sum / count;
        let variance = (returns_sq / count - mean * mean).max(0.0);
        let vol_bps = variance.sqrt() * 10_000.0;

        // Base spread plus a volatility premium, capped at 5x base.
        self.current_spread_bps =
            (self.params.base_spread_bps + vol_bps).min(self.params.base_spread_bps * 5.0);
    }

    fn quote(&mut self) {
        if !self.has_bbo {
            return;
        }

        let fair = self.fair_value();
        if fair <= 0.0 {
            return;
        }

        let half_spread = fair * self.current_spread_bps / 10_000.0 / 2.0;
        let inventory_frac = self.inventory as f64 / self.params.max_inventory as f64;
        // Long inventory pushes both quotes down to encourage sells.
        let skew = inventory_frac * self.params.skew_factor * half_spread;

        let bid = Price::from_f64(fair - half_spread - skew);
        let ask = Price::from_f64(fair + half_spread - skew);
        let ts = self.last_timestamp;

        let at_long_limit = self.inventory >= self.params.max_inventory;
        let at_short_limit = self.inventory <= -self.params.max_inventory;

        if !at_long_limit {
            self.scratch.push(
                self.params.instrument,
                Side::Buy,
                OrderType::Limit,
                bid,
                self.params.order_size,
                ts,
            );
        }
        if !at_short_limit {
            self.scratch.push(
                self.params.instrument,
                Side::Sell,
                OrderType::Limit,
                ask,
                self.params.order_size,
                ts,
            );
        }
    }
}

impl Strategy for MarketMaker {
    fn on_market_data(&mut self, md: &MarketDataMessage) {
        // Orders are per-event: anything not drained after the previous
        // event is stale.
        self.scratch.clear();

        if md.msg_type != b'W' || md.instrument != self.params.instrument {
            return;
        }
        if md.bid_price.is_zero() || md.ask_price.is_zero() {
            return;
        }

        self.best_bid = md.bid_price;
        self.best_ask = md.ask_price;
        self.has_bbo = true;
        self.last_timestamp = md.timestamp;

        self.mid_prices.push(md.mid_price().to_f64());
        self.compute_dynamic_spread();
        self.quote();
    }

    fn on_order_book_update(
        &mut self,
        instrument: InstrumentId,
        best_bid: Price,
        _bid_qty: Qty,
        best_ask: Price,
        _ask_qty: Qty,
    ) {
        if instrument != self.params.instrument || best_bid.is_zero() || best_ask.is_zero() {
            return;
        }
        self.best_bid = best_bid;
        self.best_ask = best_ask;
        self.has_bbo = true;
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
                Side::Buy => self.inventory += report.filled_quantity as i64,
                Side::Sell => self.inventory -= report.filled_quantity as i64,
            }
            tracing::debug!(
                side = %report.side,
                filled = report.filled_quantity,
                inventory = self.inventory,
                "market maker fill"
            );
        }
    }

    fn generate_orders(&mut self) -> &[OrderRequest] {
        self.scratch.as_slice()
    }

    fn on_timer(&mut self, _now: Timestamp) {}

    fn name(&self) -> &'static str {
        "MarketMaker"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(bid: i64, ask: i64) -> MarketDataMessage {
        MarketDataMessage {
            instrument: 0,
            bid_price: Price::from_ticks(bid),
            ask_price: Price::from_ticks(ask),
            bid_quantity: 100,
            ask_quantity: 100,
            last_price: Price::from_ticks((bid + ask) / 2),
            last_quantity: 50,
            timestamp: Timestamp(1),
            msg_type: b'W',
        }
    }

    fn fill(side: Side, qty: Qty) -> ExecutionReport {
        let req = OrderRequest::new(
            1,
            0,
            side,
            OrderType::Limit,
            Price::from_ticks(15_000),
            qty,
            Timestamp(1),
        );
        let mut report = ExecutionReport::rejected(&req, 1, Timestamp(2));
        report.status = OrderStatus::Filled;
        report.filled_quantity = qty;
        report.leaves_quantity = 0;
        report
    }

    #[test]
    fn test_no_orders_before_bbo() {
        let mut mm = MarketMaker::new(MarketMakerParams::default());
        assert!(mm.generate_orders().is_empty());
    }

    #[test]
    fn test_quotes_both_sides_inside_market() {
        let mut mm = MarketMaker::new(MarketMakerParams::default());
        mm.on_market_data(&snapshot(14_990, 15_010));

        let orders = mm.generate_orders().to_vec();
        assert_eq!(orders.len(), 2);
        let buy = orders.iter().find(|o| o.side == Side::Buy).unwrap();
        let sell = orders.iter().find(|o| o.side == Side::Sell).unwrap();
        assert!(buy.price < sell.price);
        assert_eq!(buy.quantity, 10);
        assert_eq!(buy.order_type, OrderType::Limit);
    }

    #[test]
    fn test_ignores_other_instruments() {
        let mut mm = MarketMaker::new(MarketMakerParams::default());
        let mut md = snapshot(14_990, 15_010);
        md.instrument = 7;
        mm.on_market_data(&md);
        assert!(mm.generate_orders().is_empty());
    }

    #[test]
    fn test_long_inventory_skews_quotes_down() {
        let params = MarketMakerParams::default();
        let mut flat = MarketMaker::new(params.clone());
        let mut long = MarketMaker::new(params);

        long.on_execution_report(&fill(Side::Buy, 50));
        assert_eq!(long.inventory(), 50);

        flat.on_market_data(&snapshot(14_990, 15_010));
        long.on_market_data(&snapshot(14_990, 15_010));

        let flat_bid = flat.generate_orders()[0].price;
        let long_bid = long.generate_orders()[0].price;
        assert!(long_bid < flat_bid, "long inventory must lower the bid");
    }

    #[test]
    fn test_at_long_limit_quotes_only_sell() {
        let mut mm = MarketMaker::new(MarketMakerParams {
            max_inventory: 20,
            ..Default::default()
        });
        mm.on_execution_report(&fill(Side::Buy, 20));
        mm.on_market_data(&snapshot(14_990, 15_010));

        let orders = mm.generate_orders().to_vec();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].side, Side::Sell);
    }

    #[test]
    fn test_at_short_limit_quotes_only_buy() {
        let mut mm = MarketMaker::new(MarketMakerParams {
            max_inventory: 20,
            ..Default::default()
        });
        mm.on_execution_report(&fill(Side::Sell, 25));
        mm.on_market_data(&snapshot(14_990, 15_010));

        let orders = mm.generate_orders().to_vec();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].side, Side::Buy);
    }

    #[test]
    fn test_partial_fill_adjusts_inventory() {
        let mut mm = MarketMaker::new(MarketMakerParams::default());
        let mut report = fill(Side::Buy, 30);
        report.status = OrderStatus::PartiallyFilled;
        mm.on_execution_report(&report);
        assert_eq!(mm.inventory(), 30);
        mm.on_execution_report(&fill(Side::Sell, 10));
        assert_eq!(mm.inventory(), 20);
    }

    #[test]
    fn test_rejects_do_not_move_inventory() {
        let mut mm = MarketMaker::new(MarketMakerParams::default());
        let req = OrderRequest::new(
            1,
            0,
            Side::Buy,
            OrderType::Limit,
            Price::from_ticks(15_000),
            10,
            Timestamp(1),
        );
        mm.on_execution_report(&ExecutionReport::rejected(&req, 1, Timestamp(2)));
        assert_eq!(mm.inventory(), 0);
    }

    #[test]
    fn test_volatility_widens_spread() {
        let mut calm = MarketMaker::new(MarketMakerParams::default());
        let mut wild = MarketMaker::new(MarketMakerParams::default());

        for i in 0..50i64 {
            calm.on_market_data(&snapshot(14_990 + i % 2, 15_010 + i % 2));
            let jump = (i % 2) * 400;
            wild.on_market_data(&snapshot(14_790 + jump, 14_810 + jump));
        }

        assert!(wild.current_spread_bps() > calm.current_spread_bps());
    }

    #[test]
    fn test_reports_interleave_with_market_data() {
        let mut mm = MarketMaker::new(MarketMakerParams::default());
        // Reports may arrive before any market data; nothing panics and
        // no orders appear until a BBO exists.
        mm.on_execution_report(&fill(Side::Buy, 10));
        assert!(mm.generate_orders().is_empty());
        mm.on_market_data(&snapshot(14_990, 15_010));
        assert_eq!(mm.generate_orders().len(), 2);
    }
}
