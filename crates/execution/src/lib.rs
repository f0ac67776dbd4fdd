//! # velo-execution
//!
//! The back half of the pipeline: per-venue matching simulators with
//! latency and probabilistic rejection ([`venue`]), venue selection and
//! cancel routing ([`router`]), and the execution engine thread that
//! consumes order requests and produces execution reports ([`engine`]).

pub mod engine;
pub mod router;
pub mod venue;

pub use engine::ExecutionEngine;
pub use router::{Router, RoutingStrategy};
pub use venue::VenueSimulator;
