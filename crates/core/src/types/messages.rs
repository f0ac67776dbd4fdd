//! Wire structs that cross the inter-stage SPSC queues.
//!
//! Every type here is `Copy` with a `#[repr(C)]` layout: queue transport is
//! a byte copy, no destructors ever run on queue slots. [`Order`] is padded
//! and aligned to one cache line so a resting order never straddles two
//! lines.

use super::order::{OrderStatus, OrderType, Side};
use super::price::Price;
use super::timestamp::Timestamp;
use super::{InstrumentId, OrderId, Qty, VenueId, CACHE_LINE};

/// An order in wire/transport form. Exactly one cache line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C, align(64))]
pub struct Order {
    /// Order identifier.
    pub id: OrderId,
    /// Instrument the order is for.
    pub instrument: InstrumentId,
    /// Buy or sell.
    pub side: Side,
    /// Limit / Market / IOC / FOK.
    pub order_type: OrderType,
    /// Lifecycle status.
    pub status: OrderStatus,
    _pad: u8,
    /// Limit price in ticks (ignored for market orders).
    pub price: Price,
    /// Total quantity.
    pub quantity: Qty,
    /// Cumulative filled quantity.
    pub filled_quantity: Qty,
    /// Creation timestamp.
    pub timestamp: Timestamp,
}

const _: () = assert!(std::mem::size_of::<Order>() == CACHE_LINE);
const _: () = assert!(std::mem::align_of::<Order>() == CACHE_LINE);

impl Order {
    /// Create a new order with zero filled quantity and `New` status.
    pub fn new(
        id: OrderId,
        instrument: InstrumentId,
        side: Side,
        order_type: OrderType,
        price: Price,
        quantity: Qty,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id,
            instrument,
            side,
            order_type,
            status: OrderStatus::New,
            _pad: 0,
            price,
            quantity,
            filled_quantity: 0,
            timestamp,
        }
    }

    /// Quantity still open.
    #[inline]
    pub fn remaining(&self) -> Qty {
        self.quantity - self.filled_quantity
    }
}

/// A match between two orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(C)]
pub struct Trade {
    /// Buy-side order id.
    pub buyer_order_id: OrderId,
    /// Sell-side order id.
    pub seller_order_id: OrderId,
    /// Instrument traded.
    pub instrument: InstrumentId,
    /// Execution price (the resting order's price).
    pub price: Price,
    /// Executed quantity.
    pub quantity: Qty,
    /// Timestamp of the incoming (aggressing) order.
    pub timestamp: Timestamp,
}

/// Normalized market data event, produced by the feed handler.
///
/// `msg_type` is the FIX discriminator: `b'W'` snapshot, `b'8'` execution,
/// `b'D'` new-order-single. Unknown types never reach the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(C)]
pub struct MarketDataMessage {
    /// Instrument the update refers to.
    pub instrument: InstrumentId,
    /// Best bid price (0 if absent).
    pub bid_price: Price,
    /// Best ask price (0 if absent).
    pub ask_price: Price,
    /// Quantity at the best bid.
    pub bid_quantity: Qty,
    /// Quantity at the best ask.
    pub ask_quantity: Qty,
    /// Last trade price.
    pub last_price: Price,
    /// Last trade quantity.
    pub last_quantity: Qty,
    /// Ingestion timestamp.
    pub timestamp: Timestamp,
    /// FIX message type byte.
    pub msg_type: u8,
}

impl MarketDataMessage {
    /// Mid price of the quoted spread, zero when either side is missing.
    #[inline]
    pub fn mid_price(&self) -> Price {
        if self.bid_price.is_zero() || self.ask_price.is_zero() {
            Price::ZERO
        } else {
            Price::from_ticks((self.bid_price.ticks() + self.ask_price.ticks()) / 2)
        }
    }
}

/// Intent to route an order to a venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct OrderRequest {
    /// Order identifier.
    pub id: OrderId,
    /// Target instrument.
    pub instrument: InstrumentId,
    /// Buy or sell.
    pub side: Side,
    /// Limit / Market / IOC / FOK.
    pub order_type: OrderType,
    /// Target venue (advisory; the router decides).
    pub exchange: VenueId,
    _pad: u8,
    /// Limit price in ticks.
    pub price: Price,
    /// Requested quantity.
    pub quantity: Qty,
    /// Creation timestamp.
    pub timestamp: Timestamp,
}

impl OrderRequest {
    /// Create a request targeting no particular venue.
    pub fn new(
        id: OrderId,
        instrument: InstrumentId,
        side: Side,
        order_type: OrderType,
        price: Price,
        quantity: Qty,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id,
            instrument,
            side,
            order_type,
            exchange: 0,
            _pad: 0,
            price,
            quantity,
            timestamp,
        }
    }
}

/// Result of a venue interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct ExecutionReport {
    /// Order this report refers to.
    pub order_id: OrderId,
    /// Venue-assigned execution id.
    pub exec_id: u64,
    /// Instrument.
    pub instrument: InstrumentId,
    /// Side of the original order.
    pub side: Side,
    /// Resulting status.
    pub status: OrderStatus,
    /// Venue that produced this report.
    pub exchange: VenueId,
    _pad: u8,
    /// Price of the last fill, or the order price when nothing filled.
    pub price: Price,
    /// Original order quantity.
    pub quantity: Qty,
    /// Cumulative filled quantity.
    pub filled_quantity: Qty,
    /// Quantity still open.
    pub leaves_quantity: Qty,
    /// Report timestamp (includes simulated venue latency).
    pub timestamp: Timestamp,
}

impl ExecutionReport {
    /// A rejection report carrying the full quantity as leaves.
    pub fn rejected(request: &OrderRequest, exec_id: u64, timestamp: Timestamp) -> Self {
        Self {
            order_id: request.id,
            exec_id,
            instrument: request.instrument,
            side: request.side,
            status: OrderStatus::Rejected,
            exchange: request.exchange,
            _pad: 0,
            price: request.price,
            quantity: request.quantity,
            filled_quantity: 0,
            leaves_quantity: request.quantity,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_is_one_cache_line() {
        assert_eq!(std::mem::size_of::<Order>(), 64);
        assert_eq!(std::mem::align_of::<Order>(), 64);
    }

    #[test]
    fn test_order_new() {
        let o = Order::new(
            7,
            0,
            Side::Buy,
            OrderType::Limit,
            Price::from_ticks(15000),
            100,
            Timestamp(42),
        );
        assert_eq!(o.status, OrderStatus::New);
        assert_eq!(o.filled_quantity, 0);
        assert_eq!(o.remaining(), 100);
    }

    #[test]
    fn test_mid_price() {
        let md = MarketDataMessage {
            bid_price: Price::from_ticks(14990),
            ask_price: Price::from_ticks(15010),
            ..Default::default()
        };
        assert_eq!(md.mid_price(), Price::from_ticks(15000));
    }

    #[test]
    fn test_mid_price_missing_side() {
        let md = MarketDataMessage {
            bid_price: Price::from_ticks(14990),
            ask_price: Price::ZERO,
            ..Default::default()
        };
        assert!(md.mid_price().is_zero());
    }

    #[test]
    fn test_rejected_report_carries_leaves() {
        let req = OrderRequest::new(
            9,
            1,
            Side::Sell,
            OrderType::Market,
            Price::ZERO,
            250,
            Timestamp(1),
        );
        let report = ExecutionReport::rejected(&req, 3, Timestamp(2));
        assert_eq!(report.status, OrderStatus::Rejected);
        assert_eq!(report.filled_quantity, 0);
        assert_eq!(report.leaves_quantity, 250);
        assert_eq!(report.order_id, 9);
    }
}
