//! A single simulated venue.
//!
//! Each venue wraps a private order book, a deterministically seeded RNG,
//! a latency constant, and a fill probability. Reports carry a timestamp
//! of `now + latency_ns` to model the venue round trip.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use velo_book::OrderBook;
use velo_core::config::ExchangeConfig;
use velo_core::types::{
    ExecutionReport, OrderId, OrderRequest, OrderStatus, OrderType, Price, Qty, Timestamp, VenueId,
};

/// Base of the venue-private id range used by [`seed_book`](VenueSimulator::seed_book).
const SEED_ORDER_ID_BASE: OrderId = 900_000_000;

/// One venue: private book, latency, and probabilistic rejection.
pub struct VenueSimulator {
    config: ExchangeConfig,
    book: OrderBook,
    rng: StdRng,
    next_exec_id: u64,
    orders_processed: u64,
    fills: u64,
    rejects: u64,
}

impl VenueSimulator {
    /// Create a venue from configuration. The RNG seed derives from the
    /// venue id, so runs are reproducible per venue.
    pub fn new(config: ExchangeConfig) -> Self {
        let seed = config.id as u64 * 1_000 + 42;
        Self {
            config,
            book: OrderBook::new(0),
            rng: StdRng::seed_from_u64(seed),
            next_exec_id: 1,
            orders_processed: 0,
            fills: 0,
            rejects: 0,
        }
    }

    /// Submit an order and produce an aggregated execution report.
    pub fn submit_order(&mut self, request: &OrderRequest) -> ExecutionReport {
        self.orders_processed += 1;

        let exec_id = self.next_exec_id;
        self.next_exec_id += 1;
        let timestamp = Timestamp::now() + self.config.latency_ns;

        // Probabilistic rejection before the book sees the order.
        let draw: f64 = self.rng.gen();
        if draw > self.config.fill_probability {
            self.rejects += 1;
            let mut report = ExecutionReport::rejected(request, exec_id, timestamp);
            report.exchange = self.config.id;
            return report;
        }

        let trades = self.book.add_order(
            request.id,
            request.side,
            request.order_type,
            request.price,
            request.quantity,
            timestamp,
        );

        let mut total_filled: Qty = 0;
        let mut last_price = Price::ZERO;
        for trade in trades {
            total_filled += trade.quantity;
            last_price = trade.price;
        }

        let mut report = ExecutionReport::rejected(request, exec_id, timestamp);
        report.exchange = self.config.id;

        if total_filled > 0 {
            self.fills += 1;
            report.filled_quantity = total_filled;
            report.leaves_quantity = request.quantity - total_filled;
            report.price = last_price;
            report.status = if report.leaves_quantity == 0 {
                OrderStatus::Filled
            } else {
                OrderStatus::PartiallyFilled
            };
        } else {
            report.filled_quantity = 0;
            report.leaves_quantity = request.quantity;
            report.price = request.price;
            report.status = match request.order_type {
                // Exhausted immediates are cancelled, resting limits ack as New.
                OrderType::Market | OrderType::Ioc | OrderType::Fok => OrderStatus::Cancelled,
                OrderType::Limit => OrderStatus::New,
            };
        }

        report
    }

    /// Cancel a resting order on this venue.
    pub fn cancel_order(&mut self, order_id: OrderId) -> ExecutionReport {
        let exec_id = self.next_exec_id;
        self.next_exec_id += 1;
        let timestamp = Timestamp::now() + self.config.latency_ns;

        let status = if self.book.cancel_order(order_id) {
            OrderStatus::Cancelled
        } else {
            OrderStatus::Rejected
        };

        let mut report = ExecutionReport::rejected(
            &OrderRequest::new(
                order_id,
                0,
                velo_core::types::Side::Buy,
                OrderType::Limit,
                Price::ZERO,
                0,
                timestamp,
            ),
            exec_id,
            timestamp,
        );
        report.exchange = self.config.id;
        report.status = status;
        report
    }

    /// Seed the book with `levels` bids below and asks above `mid_price`,
    /// one tick apart, using ids from a venue-private range.
    pub fn seed_book(&mut self, mid_price: Price, levels: u32, qty_per_level: Qty) {
        let mut oid = SEED_ORDER_ID_BASE + self.config.id as OrderId * 1_000_000;
        for i in 1..=levels as i64 {
            self.book.add_order(
                oid,
                velo_core::types::Side::Buy,
                OrderType::Limit,
                Price::from_ticks(mid_price.ticks() - i),
                qty_per_level,
                Timestamp::now(),
            );
            oid += 1;
            self.book.add_order(
                oid,
                velo_core::types::Side::Sell,
                OrderType::Limit,
                Price::from_ticks(mid_price.ticks() + i),
                qty_per_level,
                Timestamp::now(),
            );
            oid += 1;
        }
    }

    /// Venue id.
    pub fn id(&self) -> VenueId {
        self.config.id
    }

    /// Venue configuration.
    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    /// The venue's private book (read-only).
    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    /// Orders submitted to this venue.
    pub fn orders_processed(&self) -> u64 {
        self.orders_processed
    }

    /// Orders that produced at least one fill.
    pub fn fills(&self) -> u64 {
        self.fills
    }

    /// Orders rejected by the fill-probability draw.
    pub fn rejects(&self) -> u64 {
        self.rejects
    }
}
