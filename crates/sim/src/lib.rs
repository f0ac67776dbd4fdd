//! # velo-sim
//!
//! The pipeline harness: wires the feed, strategies, risk gate, and
//! execution engine together with SPSC queues, pins the stage threads,
//! and runs the simulation loop. The binary in `main.rs` is a thin CLI
//! over [`pipeline::Pipeline`].

pub mod pipeline;

pub use pipeline::{Pipeline, RunSummary};
