//! Built-in strategy policies.

pub mod market_maker;
pub mod momentum;
pub mod pairs;
