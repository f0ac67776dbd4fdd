//! # velo-core
//!
//! Shared foundations for the Velo trading pipeline simulator: fixed-point
//! prices, monotonic nanosecond timestamps, the cache-line-sized wire
//! structs that cross the inter-stage queues, the layered configuration
//! loader, tracing setup, and thread placement helpers.

pub mod config;
pub mod logging;
pub mod thread;
pub mod types;
