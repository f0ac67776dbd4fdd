//! # velo-strategy
//!
//! The strategy layer: a capability trait dispatched at most once per
//! market-data event, plus the three built-in policies (market maker,
//! pairs, momentum). Signal quality is explicitly out of scope; what
//! matters is the interaction contract — no allocation per event,
//! bounded order output, tolerance of arbitrary interleaving between
//! market data and execution reports.

pub mod strategies;
pub mod traits;

pub use strategies::market_maker::{MarketMaker, MarketMakerParams};
pub use strategies::momentum::{Momentum, MomentumParams};
pub use strategies::pairs::{PairsTrading, PairsTradingParams};
pub use traits::{OrderScratch, Strategy, MAX_ORDERS_PER_SIGNAL};
