//! The order book: price-time-priority matching with O(1) cancel.
//!
//! Bids are keyed by `Reverse<Price>` so `BTreeMap` iteration yields the
//! highest bid first; asks use natural ordering (lowest first). An id →
//! slot-index map gives O(1) lookup, and the cached BBO answers
//! top-of-book queries without touching the maps.
//!
//! Matching writes into a 64-trade scratch buffer owned by the book and
//! returns a borrowed slice. The borrow ends before the next call can
//! start, which is precisely the copy-before-next-match contract.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use velo_containers::slab::NIL;
use velo_containers::SlabPool;
use velo_core::types::{
    InstrumentId, Order, OrderId, OrderStatus, OrderType, Price, Qty, Side, Timestamp, Trade,
};

use crate::level::{BookEntry, PriceLevel};

/// Maximum trades recorded per matching call.
pub const MAX_TRADES_PER_MATCH: usize = 64;

/// Default resting-order pool capacity.
const DEFAULT_POOL_CAPACITY: usize = 65_536;

/// One aggregated level of market depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DepthEntry {
    /// Level price.
    pub price: Price,
    /// Aggregate residual quantity at the level.
    pub quantity: Qty,
    /// Number of resting orders at the level.
    pub order_count: u32,
}

/// Price-time-priority matching book for one instrument.
pub struct OrderBook {
    instrument: InstrumentId,
    pool: SlabPool<BookEntry>,
    /// Bid levels, highest price first under iteration.
    bids: BTreeMap<Reverse<Price>, PriceLevel>,
    /// Ask levels, lowest price first under iteration.
    asks: BTreeMap<Price, PriceLevel>,
    /// Order id -> slab slot of the entry.
    orders: HashMap<OrderId, u32>,
    best_bid: Price,
    best_ask: Price,
    best_bid_qty: Qty,
    best_ask_qty: Qty,
    /// Per-call scratch; cleared at the start of every matching call.
    trades: Vec<Trade>,
}

impl OrderBook {
    /// Create a book with the default resting-order capacity.
    pub fn new(instrument: InstrumentId) -> Self {
        Self::with_pool_capacity(instrument, DEFAULT_POOL_CAPACITY)
    }

    /// Create a book with an explicit resting-order capacity.
    pub fn with_pool_capacity(instrument: InstrumentId, pool_capacity: usize) -> Self {
        Self {
            instrument,
            pool: SlabPool::with_capacity(pool_capacity),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            orders: HashMap::new(),
            best_bid: Price::ZERO,
            best_ask: Price::ZERO,
            best_bid_qty: 0,
            best_ask_qty: 0,
            trades: Vec::with_capacity(MAX_TRADES_PER_MATCH),
        }
    }

    /// Add an order and match it against the opposite side.
    ///
    /// Returns the trades produced, at most [`MAX_TRADES_PER_MATCH`]. The
    /// slice lives in scratch storage that the next matching call
    /// overwrites; callers copy anything they need to keep.
    ///
    /// Orders are dropped without touching the book when the pool is
    /// exhausted, the quantity is zero, or the id is already present.
    pub fn add_order(
        &mut self,
        id: OrderId,
        side: Side,
        order_type: OrderType,
        price: Price,
        quantity: Qty,
        timestamp: Timestamp,
    ) -> &[Trade] {
        self.trades.clear();

        if quantity == 0 || self.orders.contains_key(&id) {
            return &self.trades;
        }

        let entry = BookEntry::new(Order::new(
            id,
            self.instrument,
            side,
            order_type,
            price,
            quantity,
            timestamp,
        ));

        let Some(idx) = self.pool.allocate(entry) else {
            // Pool exhausted: the book cannot accept more orders.
            return &self.trades;
        };
        self.orders.insert(id, idx);

        // FOK is two-phase: prove full satisfiability before mutating
        // anything, so an unfillable order leaves the book untouched.
        if order_type == OrderType::Fok && !self.fok_fillable(side, price, quantity) {
            self.orders.remove(&id);
            self.pool.free(idx);
            return &self.trades;
        }

        self.match_incoming(idx);

        let after = *self.pool.get(idx);
        if after.remaining() > 0 {
            match order_type {
                OrderType::Limit => {
                    self.pool.get_mut(idx).order.status = if after.order.filled_quantity > 0 {
                        OrderStatus::PartiallyFilled
                    } else {
                        OrderStatus::New
                    };
                    self.rest_on_book(idx);
                }
                OrderType::Market | OrderType::Ioc | OrderType::Fok => {
                    self.orders.remove(&id);
                    self.pool.free(idx);
                }
            }
        } else {
            self.orders.remove(&id);
            self.pool.free(idx);
        }

        &self.trades
    }

    /// Cancel a resting order. Returns `false` if the id is unknown.
    pub fn cancel_order(&mut self, id: OrderId) -> bool {
        let Some(&idx) = self.orders.get(&id) else {
            return false;
        };
        let entry = *self.pool.get(idx);
        let price = entry.order.price;

        match entry.order.side {
            Side::Buy => {
                let key = Reverse(price);
                if let Some(level) = self.bids.get_mut(&key) {
                    level.unlink(&mut self.pool, idx);
                    if level.is_empty() {
                        self.bids.remove(&key);
                    }
                }
                self.update_best_bid();
            }
            Side::Sell => {
                if let Some(level) = self.asks.get_mut(&price) {
                    level.unlink(&mut self.pool, idx);
                    if level.is_empty() {
                        self.asks.remove(&price);
                    }
                }
                self.update_best_ask();
            }
        }

        self.orders.remove(&id);
        self.pool.free(idx);
        true
    }

    /// Cancel and re-add with new price/quantity. Time priority is lost.
    ///
    /// Returns any trades the re-added order produces; an unknown id
    /// returns an empty slice.
    pub fn modify_order(&mut self, id: OrderId, new_price: Price, new_quantity: Qty) -> &[Trade] {
        let Some(&idx) = self.orders.get(&id) else {
            self.trades.clear();
            return &self.trades;
        };
        let (side, order_type, timestamp) = {
            let e = &self.pool.get(idx).order;
            (e.side, e.order_type, e.timestamp)
        };

        self.cancel_order(id);
        self.add_order(id, side, order_type, new_price, new_quantity, timestamp)
    }

    /// Cached best bid price; zero when the bid side is empty.
    #[inline]
    pub fn best_bid(&self) -> Price {
        self.best_bid
    }

    /// Cached best ask price; zero when the ask side is empty.
    #[inline]
    pub fn best_ask(&self) -> Price {
        self.best_ask
    }

    /// Aggregate quantity at the best bid.
    #[inline]
    pub fn best_bid_quantity(&self) -> Qty {
        self.best_bid_qty
    }

    /// Aggregate quantity at the best ask.
    #[inline]
    pub fn best_ask_quantity(&self) -> Qty {
        self.best_ask_qty
    }

    /// Spread in ticks; zero when either side is empty.
    pub fn spread(&self) -> Price {
        if self.bids.is_empty() || self.asks.is_empty() {
            Price::ZERO
        } else {
            self.best_ask - self.best_bid
        }
    }

    /// Fill `bids_out`/`asks_out` with depth from best to worst.
    ///
    /// Returns `(bid_levels, ask_levels)` written.
    pub fn depth(&self, bids_out: &mut [DepthEntry], asks_out: &mut [DepthEntry]) -> (usize, usize) {
        let mut bid_count = 0;
        for (out, (&Reverse(price), level)) in bids_out.iter_mut().zip(self.bids.iter()) {
            *out = DepthEntry {
                price,
                quantity: level.total_quantity,
                order_count: level.order_count,
            };
            bid_count += 1;
        }

        let mut ask_count = 0;
        for (out, (&price, level)) in asks_out.iter_mut().zip(self.asks.iter()) {
            *out = DepthEntry {
                price,
                quantity: level.total_quantity,
                order_count: level.order_count,
            };
            ask_count += 1;
        }

        (bid_count, ask_count)
    }

    /// Volume-weighted average price over the top `levels` of `side`, in
    /// currency units. Zero when the side is empty.
    pub fn vwap(&self, side: Side, levels: usize) -> f64 {
        let mut total_value = 0.0;
        let mut total_qty = 0.0;

        match side {
            Side::Buy => {
                for (&Reverse(price), level) in self.bids.iter().take(levels) {
                    let qty = level.total_quantity as f64;
                    total_value += price.to_f64() * qty;
                    total_qty += qty;
                }
            }
            Side::Sell => {
                for (&price, level) in self.asks.iter().take(levels) {
                    let qty = level.total_quantity as f64;
                    total_value += price.to_f64() * qty;
                    total_qty += qty;
                }
            }
        }

        if total_qty > 0.0 {
            total_value / total_qty
        } else {
            0.0
        }
    }

    /// Number of resting orders.
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Number of populated bid levels.
    pub fn bid_level_count(&self) -> usize {
        self.bids.len()
    }

    /// Number of populated ask levels.
    pub fn ask_level_count(&self) -> usize {
        self.asks.len()
    }

    /// Instrument this book matches.
    pub fn instrument(&self) -> InstrumentId {
        self.instrument
    }

    // ── Matching internals ─────────────────────────────────────────────

    /// Walk the opposite side from best to worst, filling the incoming
    /// entry. Levels emptied by the walk are removed; the consumed side's
    /// cached BBO is refreshed afterwards.
    fn match_incoming(&mut self, incoming_idx: u32) {
        let (side, order_type, limit_price) = {
            let e = &self.pool.get(incoming_idx).order;
            (e.side, e.order_type, e.price)
        };
        // Market orders match at any price; Limit/IOC/FOK stop at the
        // first non-marketable level.
        let limit = match order_type {
            OrderType::Market => None,
            _ => Some(limit_price),
        };

        let Self {
            pool,
            bids,
            asks,
            orders,
            trades,
            instrument,
            ..
        } = self;

        match side {
            Side::Buy => loop {
                let Some((&price, _)) = asks.first_key_value() else {
                    break;
                };
                if matches!(limit, Some(lim) if price > lim) {
                    break;
                }
                let level = asks.get_mut(&price).expect("level just observed");
                let done = consume_level(pool, orders, trades, level, *instrument, incoming_idx);
                if level.is_empty() {
                    asks.remove(&price);
                }
                if done {
                    break;
                }
            },
            Side::Sell => loop {
                let Some((&Reverse(price), _)) = bids.first_key_value() else {
                    break;
                };
                if matches!(limit, Some(lim) if price < lim) {
                    break;
                }
                let level = bids.get_mut(&Reverse(price)).expect("level just observed");
                let done = consume_level(pool, orders, trades, level, *instrument, incoming_idx);
                if level.is_empty() {
                    bids.remove(&Reverse(price));
                }
                if done {
                    break;
                }
            },
        }

        match side {
            Side::Buy => self.update_best_ask(),
            Side::Sell => self.update_best_bid(),
        }
    }

    /// Read-only check that a FOK order can fill completely within the
    /// per-call trade cap. Mutates nothing.
    fn fok_fillable(&self, side: Side, limit: Price, quantity: Qty) -> bool {
        let mut needed = quantity;
        let mut trades_left = MAX_TRADES_PER_MATCH;

        let mut scan_level = |level: &PriceLevel| {
            let mut idx = level.front();
            while idx != NIL && needed > 0 && trades_left > 0 {
                let entry = self.pool.get(idx);
                needed = needed.saturating_sub(entry.remaining());
                trades_left -= 1;
                idx = entry.next;
            }
            needed == 0 || trades_left == 0
        };

        match side {
            Side::Buy => {
                for (&price, level) in self.asks.iter() {
                    if price > limit {
                        break;
                    }
                    if scan_level(level) {
                        break;
                    }
                }
            }
            Side::Sell => {
                for (&Reverse(price), level) in self.bids.iter() {
                    if price < limit {
                        break;
                    }
                    if scan_level(level) {
                        break;
                    }
                }
            }
        }

        needed == 0
    }

    /// Link a residual limit order into its level, creating the level if
    /// absent, and refresh the cached BBO on that side.
    fn rest_on_book(&mut self, idx: u32) {
        let (side, price) = {
            let e = &self.pool.get(idx).order;
            (e.side, e.price)
        };

        match side {
            Side::Buy => {
                let level = self
                    .bids
                    .entry(Reverse(price))
                    .or_insert_with(|| PriceLevel::new(price));
                level.push_back(&mut self.pool, idx);
                self.update_best_bid();
            }
            Side::Sell => {
                let level = self
                    .asks
                    .entry(price)
                    .or_insert_with(|| PriceLevel::new(price));
                level.push_back(&mut self.pool, idx);
                self.update_best_ask();
            }
        }
    }

    fn update_best_bid(&mut self) {
        match self.bids.first_key_value() {
            Some((&Reverse(price), level)) => {
                self.best_bid = price;
                self.best_bid_qty = level.total_quantity;
            }
            None => {
                self.best_bid = Price::ZERO;
                self.best_bid_qty = 0;
            }
        }
    }

    fn update_best_ask(&mut self) {
        match self.asks.first_key_value() {
            Some((&price, level)) => {
                self.best_ask = price;
                self.best_ask_qty = level.total_quantity;
            }
            None => {
                self.best_ask = Price::ZERO;
                self.best_ask_qty = 0;
            }
        }
    }
}

/// Consume resting orders at one level, head (oldest) first.
///
/// Returns `true` when the incoming order is done: fully filled or the
/// per-call trade cap is reached.
fn consume_level(
    pool: &mut SlabPool<BookEntry>,
    orders: &mut HashMap<OrderId, u32>,
    trades: &mut Vec<Trade>,
    level: &mut PriceLevel,
    instrument: InstrumentId,
    incoming_idx: u32,
) -> bool {
    loop {
        if trades.len() >= MAX_TRADES_PER_MATCH {
            return true;
        }

        let incoming = pool.get(incoming_idx).order;
        if incoming.remaining() == 0 {
            return true;
        }

        let resting_idx = level.front();
        if resting_idx == NIL {
            return false;
        }
        let resting = pool.get(resting_idx).order;

        let fill = incoming.remaining().min(resting.remaining());

        // Trade price is the resting order's price; the timestamp is the
        // incoming order's.
        let (buyer, seller) = match incoming.side {
            Side::Buy => (incoming.id, resting.id),
            Side::Sell => (resting.id, incoming.id),
        };
        trades.push(Trade {
            buyer_order_id: buyer,
            seller_order_id: seller,
            instrument,
            price: resting.price,
            quantity: fill,
            timestamp: incoming.timestamp,
        });

        pool.get_mut(incoming_idx).order.filled_quantity += fill;
        pool.get_mut(resting_idx).order.filled_quantity += fill;
        level.total_quantity -= fill;

        if pool.get(resting_idx).remaining() == 0 {
            pool.get_mut(resting_idx).order.status = OrderStatus::Filled;
            level.unlink(pool, resting_idx);
            orders.remove(&resting.id);
            pool.free(resting_idx);
        } else {
            pool.get_mut(resting_idx).order.status = OrderStatus::PartiallyFilled;
        }
    }
}
