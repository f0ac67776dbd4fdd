//! # velo-containers
//!
//! The fixed-capacity containers the pipeline's hot path is built from:
//!
//! - [`spsc`] — lock-free single-producer/single-consumer ring buffer
//!   stitching pipeline stages together.
//! - [`slab`] — fixed-capacity index-linked slab allocator backing the
//!   order book's resting entries.
//! - [`window`] — overwrite-on-full rolling window used by strategies and
//!   latency tracking.
//!
//! None of these allocate after construction, and none ever block.

pub mod slab;
pub mod spsc;
pub mod window;

pub use slab::SlabPool;
pub use spsc::{spsc_ring, Consumer, Producer};
pub use window::RollingWindow;
