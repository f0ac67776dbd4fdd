//! Flat-array position and P&L tracking.
//!
//! State is four fixed arrays indexed by `InstrumentId`: signed position,
//! average entry price, last mark price, and per-instrument realized P&L,
//! plus one aggregate realized P&L scalar. Every operation is O(1) or a
//! single array sweep; nothing allocates. The tracker is mutated only by
//! the thread that consumes execution reports (see the pipeline), so none
//! of this needs synchronization.
//!
//! Prices convert to `f64` only inside the P&L arithmetic.

use velo_core::types::{InstrumentId, Price, Qty, Side, MAX_INSTRUMENTS};

/// Per-instrument signed position with weighted-average-cost P&L.
pub struct PositionTracker {
    positions: [i64; MAX_INSTRUMENTS],
    avg_prices: [f64; MAX_INSTRUMENTS],
    mark_prices: [Price; MAX_INSTRUMENTS],
    instrument_pnl: [f64; MAX_INSTRUMENTS],
    realized_pnl: f64,
}

impl PositionTracker {
    /// Create a tracker with all positions flat.
    pub fn new() -> Self {
        Self {
            positions: [0; MAX_INSTRUMENTS],
            avg_prices: [0.0; MAX_INSTRUMENTS],
            mark_prices: [Price::ZERO; MAX_INSTRUMENTS],
            instrument_pnl: [0.0; MAX_INSTRUMENTS],
            realized_pnl: 0.0,
        }
    }

    /// Apply a fill.
    ///
    /// Increasing the position in the current direction updates the
    /// weighted average entry; reducing or reversing realizes P&L on the
    /// closed portion; a sign flip starts a fresh average at the fill
    /// price.
    pub fn on_fill(&mut self, instrument: InstrumentId, side: Side, quantity: Qty, price: Price) {
        let Some(i) = index(instrument) else {
            return;
        };

        let signed_qty = quantity as i64;
        let fill_price = price.to_f64();
        let pos = self.positions[i];

        match side {
            Side::Buy => {
                if pos >= 0 {
                    // Adding to a long: weighted average entry.
                    let total_cost =
                        self.avg_prices[i] * pos as f64 + fill_price * signed_qty as f64;
                    let new_pos = pos + signed_qty;
                    if new_pos > 0 {
                        self.avg_prices[i] = total_cost / new_pos as f64;
                    }
                    self.positions[i] = new_pos;
                } else {
                    // Covering a short: realize on the closed portion.
                    let cover_qty = signed_qty.min(-pos);
                    let pnl = cover_qty as f64 * (self.avg_prices[i] - fill_price);
                    self.realized_pnl += pnl;
                    self.instrument_pnl[i] += pnl;
                    let new_pos = pos + signed_qty;
                    if new_pos > 0 {
                        self.avg_prices[i] = fill_price;
                    } else if new_pos == 0 {
                        self.avg_prices[i] = 0.0;
                    }
                    self.positions[i] = new_pos;
                }
            }
            Side::Sell => {
                if pos <= 0 {
                    // Adding to a short.
                    let total_cost =
                        self.avg_prices[i] * (-pos) as f64 + fill_price * signed_qty as f64;
                    let new_pos = pos - signed_qty;
                    if new_pos < 0 {
                        self.avg_prices[i] = total_cost / (-new_pos) as f64;
                    }
                    self.positions[i] = new_pos;
                } else {
                    // Selling a long.
                    let close_qty = signed_qty.min(pos);
                    let pnl = close_qty as f64 * (fill_price - self.avg_prices[i]);
                    self.realized_pnl += pnl;
                    self.instrument_pnl[i] += pnl;
                    let new_pos = pos - signed_qty;
                    if new_pos < 0 {
                        self.avg_prices[i] = fill_price;
                    } else if new_pos == 0 {
                        self.avg_prices[i] = 0.0;
                    }
                    self.positions[i] = new_pos;
                }
            }
        }
    }

    /// Record the latest mark price for an instrument.
    pub fn update_mark_price(&mut self, instrument: InstrumentId, price: Price) {
        if let Some(i) = index(instrument) {
            self.mark_prices[i] = price;
        }
    }

    /// Signed position for an instrument (0 for out-of-range ids).
    #[inline]
    pub fn position(&self, instrument: InstrumentId) -> i64 {
        index(instrument).map_or(0, |i| self.positions[i])
    }

    /// Average entry price for an instrument, in currency units.
    #[inline]
    pub fn avg_price(&self, instrument: InstrumentId) -> f64 {
        index(instrument).map_or(0.0, |i| self.avg_prices[i])
    }

    /// Sum of absolute positions across all instruments.
    pub fn total_absolute_position(&self) -> i64 {
        self.positions.iter().map(|p| p.abs()).sum()
    }

    /// Realized P&L accumulated across all instruments.
    #[inline]
    pub fn realized_pnl(&self) -> f64 {
        self.realized_pnl
    }

    /// Realized P&L for a single instrument.
    #[inline]
    pub fn instrument_pnl(&self, instrument: InstrumentId) -> f64 {
        index(instrument).map_or(0.0, |i| self.instrument_pnl[i])
    }

    /// Mark-to-market P&L over instruments with a nonzero position and a
    /// known mark price.
    pub fn unrealized_pnl(&self) -> f64 {
        let mut pnl = 0.0;
        for i in 0..MAX_INSTRUMENTS {
            let pos = self.positions[i];
            if pos != 0 && !self.mark_prices[i].is_zero() {
                let mark = self.mark_prices[i].to_f64();
                if pos > 0 {
                    pnl += pos as f64 * (mark - self.avg_prices[i]);
                } else {
                    pnl += (-pos) as f64 * (self.avg_prices[i] - mark);
                }
            }
        }
        pnl
    }

    /// Realized plus unrealized P&L.
    #[inline]
    pub fn total_pnl(&self) -> f64 {
        self.realized_pnl + self.unrealized_pnl()
    }

    /// Approximate capital deployed: sum of |position| * price, preferring
    /// the mark price over the average entry when available.
    pub fn capital_used(&self) -> f64 {
        let mut capital = 0.0;
        for i in 0..MAX_INSTRUMENTS {
            let pos = self.positions[i];
            if pos != 0 {
                let price = if self.mark_prices[i].ticks() > 0 {
                    self.mark_prices[i].to_f64()
                } else {
                    self.avg_prices[i]
                };
                capital += pos.abs() as f64 * price;
            }
        }
        capital
    }

    /// Flatten all state back to zero.
    pub fn reset(&mut self) {
        self.positions = [0; MAX_INSTRUMENTS];
        self.avg_prices = [0.0; MAX_INSTRUMENTS];
        self.mark_prices = [Price::ZERO; MAX_INSTRUMENTS];
        self.instrument_pnl = [0.0; MAX_INSTRUMENTS];
        self.realized_pnl = 0.0;
    }
}

impl Default for PositionTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn index(instrument: InstrumentId) -> Option<usize> {
    let i = instrument as usize;
    (i < MAX_INSTRUMENTS).then_some(i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(v: f64) -> Price {
        Price::from_f64(v)
    }

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected ~{expected}, got {actual}"
        );
    }

    #[test]
    fn test_single_buy_opens_long() {
        let mut t = PositionTracker::new();
        t.on_fill(0, Side::Buy, 100, price(150.0));
        assert_eq!(t.position(0), 100);
        assert_approx(t.avg_price(0), 150.0);
        assert_approx(t.realized_pnl(), 0.0);
    }

    #[test]
    fn test_single_sell_opens_short() {
        let mut t = PositionTracker::new();
        t.on_fill(0, Side::Sell, 100, price(150.0));
        assert_eq!(t.position(0), -100);
        assert_approx(t.avg_price(0), 150.0);
    }

    #[test]
    fn test_adding_to_long_updates_weighted_average() {
        let mut t = PositionTracker::new();
        t.on_fill(0, Side::Buy, 100, price(150.0));
        t.on_fill(0, Side::Buy, 100, price(152.0));
        assert_eq!(t.position(0), 200);
        assert_approx(t.avg_price(0), 151.0);
    }

    #[test]
    fn test_adding_to_short_updates_weighted_average() {
        let mut t = PositionTracker::new();
        t.on_fill(0, Side::Sell, 100, price(150.0));
        t.on_fill(0, Side::Sell, 300, price(154.0));
        assert_eq!(t.position(0), -400);
        assert_approx(t.avg_price(0), 153.0);
    }

    #[test]
    fn test_close_long_realizes_pnl() {
        let mut t = PositionTracker::new();
        t.on_fill(0, Side::Buy, 100, price(150.0));
        t.on_fill(0, Side::Sell, 100, price(151.0));
        assert_eq!(t.position(0), 0);
        assert_approx(t.realized_pnl(), 100.0);
        assert_approx(t.avg_price(0), 0.0);
    }

    #[test]
    fn test_cover_short_realizes_pnl() {
        let mut t = PositionTracker::new();
        t.on_fill(0, Side::Sell, 100, price(150.0));
        t.on_fill(0, Side::Buy, 100, price(149.0));
        assert_eq!(t.position(0), 0);
        assert_approx(t.realized_pnl(), 100.0);
    }

    #[test]
    fn test_partial_close_keeps_average() {
        let mut t = PositionTracker::new();
        t.on_fill(0, Side::Buy, 200, price(150.0));
        t.on_fill(0, Side::Sell, 50, price(152.0));
        assert_eq!(t.position(0), 150);
        assert_approx(t.avg_price(0), 150.0);
        assert_approx(t.realized_pnl(), 100.0);
    }

    #[test]
    fn test_flip_long_to_short() {
        let mut t = PositionTracker::new();
        t.on_fill(0, Side::Buy, 100, price(150.0));
        // Sell 150: close 100 at +1 each, open 50 short at 151.
        t.on_fill(0, Side::Sell, 150, price(151.0));
        assert_eq!(t.position(0), -50);
        assert_approx(t.realized_pnl(), 100.0);
        assert_approx(t.avg_price(0), 151.0);
    }

    #[test]
    fn test_flip_short_to_long() {
        let mut t = PositionTracker::new();
        t.on_fill(0, Side::Sell, 100, price(150.0));
        t.on_fill(0, Side::Buy, 150, price(149.0));
        assert_eq!(t.position(0), 50);
        assert_approx(t.realized_pnl(), 100.0);
        assert_approx(t.avg_price(0), 149.0);
    }

    /// Position additivity: buys and sells netting to zero produce the
    /// standard weighted-average accounting result.
    #[test]
    fn test_netting_to_zero_additivity() {
        let mut t = PositionTracker::new();
        t.on_fill(0, Side::Buy, 100, price(150.0));
        t.on_fill(0, Side::Buy, 200, price(153.0));
        // Average entry: (150*100 + 153*200) / 300 = 152.
        t.on_fill(0, Side::Sell, 100, price(155.0));
        t.on_fill(0, Side::Sell, 200, price(151.0));

        assert_eq!(t.position(0), 0);
        // (155-152)*100 + (151-152)*200 = 300 - 200 = 100.
        assert_approx(t.realized_pnl(), 100.0);
        assert_approx(t.unrealized_pnl(), 0.0);
    }

    #[test]
    fn test_unrealized_pnl_long_and_short() {
        let mut t = PositionTracker::new();
        t.on_fill(0, Side::Buy, 100, price(150.0));
        t.on_fill(1, Side::Sell, 50, price(280.0));

        t.update_mark_price(0, price(151.0));
        t.update_mark_price(1, price(278.0));

        // Long: 100 * (151 - 150) = 100; short: 50 * (280 - 278) = 100.
        assert_approx(t.unrealized_pnl(), 200.0);
        assert_approx(t.total_pnl(), 200.0);
    }

    #[test]
    fn test_unrealized_pnl_ignores_unmarked_instruments() {
        let mut t = PositionTracker::new();
        t.on_fill(0, Side::Buy, 100, price(150.0));
        assert_approx(t.unrealized_pnl(), 0.0);
    }

    #[test]
    fn test_total_absolute_position() {
        let mut t = PositionTracker::new();
        t.on_fill(0, Side::Buy, 100, price(150.0));
        t.on_fill(1, Side::Sell, 40, price(280.0));
        assert_eq!(t.total_absolute_position(), 140);
    }

    #[test]
    fn test_capital_used_prefers_mark() {
        let mut t = PositionTracker::new();
        t.on_fill(0, Side::Buy, 100, price(150.0));
        assert_approx(t.capital_used(), 15_000.0);
        t.update_mark_price(0, price(160.0));
        assert_approx(t.capital_used(), 16_000.0);
    }

    #[test]
    fn test_instrument_pnl_tracked_separately() {
        let mut t = PositionTracker::new();
        t.on_fill(0, Side::Buy, 100, price(150.0));
        t.on_fill(0, Side::Sell, 100, price(151.0));
        t.on_fill(1, Side::Sell, 10, price(280.0));
        t.on_fill(1, Side::Buy, 10, price(285.0));

        assert_approx(t.instrument_pnl(0), 100.0);
        assert_approx(t.instrument_pnl(1), -50.0);
        assert_approx(t.realized_pnl(), 50.0);
    }

    #[test]
    fn test_out_of_range_instrument_ignored() {
        let mut t = PositionTracker::new();
        t.on_fill(MAX_INSTRUMENTS as InstrumentId, Side::Buy, 100, price(150.0));
        assert_eq!(t.position(MAX_INSTRUMENTS as InstrumentId), 0);
        assert_eq!(t.total_absolute_position(), 0);
    }

    #[test]
    fn test_reset() {
        let mut t = PositionTracker::new();
        t.on_fill(0, Side::Buy, 100, price(150.0));
        t.update_mark_price(0, price(151.0));
        t.reset();
        assert_eq!(t.position(0), 0);
        assert_approx(t.realized_pnl(), 0.0);
        assert_approx(t.unrealized_pnl(), 0.0);
        assert_approx(t.capital_used(), 0.0);
    }
}
