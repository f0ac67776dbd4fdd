//! # velo-book
//!
//! Price-time-priority matching engine. Resting orders live in a fixed
//! [`SlabPool`](velo_containers::SlabPool) and are linked into per-price
//! FIFO levels through slot indices, giving O(1) cancel without raw
//! pointers. The book caches the best bid and offer and answers depth and
//! VWAP queries from the ordered level maps.

mod book;
mod level;

pub use book::{DepthEntry, OrderBook, MAX_TRADES_PER_MATCH};
pub use level::{BookEntry, PriceLevel};
