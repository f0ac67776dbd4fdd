//! Core strategy trait and the shared order scratch buffer.
//!
//! All callbacks are synchronous — no async, no locks, no I/O on the hot
//! path. A strategy accumulates intent in its pre-allocated
//! [`OrderScratch`] and hands it out through
//! [`generate_orders`](Strategy::generate_orders); the returned slice is
//! overwritten by the next signal.

use velo_core::types::{
    ExecutionReport, InstrumentId, MarketDataMessage, OrderId, OrderRequest, OrderType, Price, Qty,
    Side, Timestamp, Trade,
};

/// Upper bound on orders a strategy may emit per signal.
pub const MAX_ORDERS_PER_SIGNAL: usize = 8;

/// Trading strategy capability set.
///
/// The pipeline dispatches each market-data event to every strategy at
/// most once, then drains the generated orders. Market data and
/// execution reports interleave arbitrarily — there is no ordering
/// guarantee across queues — and implementations must tolerate that.
pub trait Strategy: Send {
    /// Called on every normalized market-data message.
    fn on_market_data(&mut self, md: &MarketDataMessage);

    /// Called when a book's top of book changes.
    fn on_order_book_update(
        &mut self,
        instrument: InstrumentId,
        best_bid: Price,
        bid_qty: Qty,
        best_ask: Price,
        ask_qty: Qty,
    );

    /// Called on a trade print.
    fn on_trade(&mut self, trade: &Trade);

    /// Called on every execution report for this strategy's orders.
    fn on_execution_report(&mut self, report: &ExecutionReport);

    /// Drain the orders generated since the last call.
    ///
    /// The slice points into strategy-owned scratch and is overwritten by
    /// the next signal; at most [`MAX_ORDERS_PER_SIGNAL`] entries.
    fn generate_orders(&mut self) -> &[OrderRequest];

    /// Periodic timer callback.
    fn on_timer(&mut self, now: Timestamp);

    /// Strategy name for logging and reports.
    fn name(&self) -> &'static str;
}

/// Pre-allocated order buffer shared by the built-in strategies.
///
/// Holds at most [`MAX_ORDERS_PER_SIGNAL`] requests; pushes beyond the
/// cap are dropped. Order ids are drawn from a strategy-private range so
/// ids never collide across strategies.
pub struct OrderScratch {
    orders: Vec<OrderRequest>,
    next_order_id: OrderId,
}

impl OrderScratch {
    /// Create a scratch buffer drawing ids from `base_order_id` upwards.
    pub fn new(base_order_id: OrderId) -> Self {
        Self {
            orders: Vec::with_capacity(MAX_ORDERS_PER_SIGNAL),
            next_order_id: base_order_id,
        }
    }

    /// Queue an order request. Returns its id, or `None` when the
    /// per-signal cap is reached.
    #[allow(clippy::too_many_arguments)]
    pub fn push(
        &mut self,
        instrument: InstrumentId,
        side: Side,
        order_type: OrderType,
        price: Price,
        quantity: Qty,
        timestamp: Timestamp,
    ) -> Option<OrderId> {
        if self.orders.len() >= MAX_ORDERS_PER_SIGNAL {
            return None;
        }
        let id = self.next_order_id;
        self.next_order_id += 1;
        self.orders.push(OrderRequest::new(
            id, instrument, side, order_type, price, quantity, timestamp,
        ));
        Some(id)
    }

    /// Drop any queued orders.
    #[inline]
    pub fn clear(&mut self) {
        self.orders.clear();
    }

    /// The queued orders.
    #[inline]
    pub fn as_slice(&self) -> &[OrderRequest] {
        &self.orders
    }

    /// Number of queued orders.
    #[inline]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Returns `true` when nothing is queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic_from_base() {
        let mut scratch = OrderScratch::new(100_000);
        let a = scratch
            .push(0, Side::Buy, OrderType::Limit, Price(100), 1, Timestamp(0))
            .unwrap();
        let b = scratch
            .push(0, Side::Sell, OrderType::Limit, Price(101), 1, Timestamp(0))
            .unwrap();
        assert_eq!(a, 100_000);
        assert_eq!(b, 100_001);
        assert_eq!(scratch.as_slice().len(), 2);
    }

    #[test]
    fn test_cap_enforced() {
        let mut scratch = OrderScratch::new(1);
        for _ in 0..MAX_ORDERS_PER_SIGNAL {
            assert!(scratch
                .push(0, Side::Buy, OrderType::Limit, Price(100), 1, Timestamp(0))
                .is_some());
        }
        assert!(scratch
            .push(0, Side::Buy, OrderType::Limit, Price(100), 1, Timestamp(0))
            .is_none());
        assert_eq!(scratch.len(), MAX_ORDERS_PER_SIGNAL);
    }

    #[test]
    fn test_clear_keeps_id_sequence() {
        let mut scratch = OrderScratch::new(10);
        scratch
            .push(0, Side::Buy, OrderType::Limit, Price(100), 1, Timestamp(0))
            .unwrap();
        scratch.clear();
        assert!(scratch.is_empty());
        let id = scratch
            .push(0, Side::Buy, OrderType::Limit, Price(100), 1, Timestamp(0))
            .unwrap();
        // Ids keep advancing; they are never reused.
        assert_eq!(id, 11);
    }
}
