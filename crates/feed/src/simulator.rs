//! Synthetic FIX feed with random-walk pricing.
//!
//! The simulator owns per-instrument state (mid price, volatility,
//! spread, base size) and emits `35=W` snapshot messages round-robin
//! across instruments into a reusable buffer. The RNG is seeded with a
//! fixed constant so runs are reproducible.

use std::fmt::Write;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use velo_core::types::{InstrumentId, Qty};

/// Deterministic seed for reproducible runs.
const FEED_SEED: u64 = 42;

/// Pre-allocated message buffer size.
const MSG_BUFFER_SIZE: usize = 512;

/// State of one simulated instrument.
#[derive(Debug, Clone)]
pub struct InstrumentState {
    pub id: InstrumentId,
    pub symbol: String,
    /// Current mid price in currency units.
    pub mid_price: f64,
    /// Per-tick volatility as a fraction of the mid.
    pub volatility: f64,
    /// Quoted spread in currency units.
    pub spread: f64,
    /// Base quote size.
    pub base_size: Qty,
}

/// Random-walk FIX snapshot generator.
pub struct FeedSimulator {
    instruments: Vec<InstrumentState>,
    rng: StdRng,
    normal: Normal<f64>,
    msg_count: u64,
    current_instrument: usize,
    buffer: String,
}

impl FeedSimulator {
    /// Create an empty simulator with the fixed deterministic seed.
    pub fn new() -> Self {
        Self {
            instruments: Vec::new(),
            rng: StdRng::seed_from_u64(FEED_SEED),
            normal: Normal::new(0.0, 1.0).expect("unit normal is well-formed"),
            msg_count: 0,
            current_instrument: 0,
            buffer: String::with_capacity(MSG_BUFFER_SIZE),
        }
    }

    /// Register an instrument to simulate.
    pub fn add_instrument(
        &mut self,
        id: InstrumentId,
        symbol: &str,
        initial_price: f64,
        volatility: f64,
        spread: f64,
        base_size: Qty,
    ) {
        self.instruments.push(InstrumentState {
            id,
            symbol: symbol.to_string(),
            mid_price: initial_price,
            volatility,
            spread,
            base_size,
        });
    }

    /// Generate the next snapshot message, advancing the random walk for
    /// the next instrument in round-robin order.
    ///
    /// Returns a view into the internal buffer, overwritten on every
    /// call; empty when no instruments are registered.
    pub fn next_message(&mut self) -> &str {
        if self.instruments.is_empty() {
            return "";
        }

        let idx = self.current_instrument;
        self.current_instrument = (self.current_instrument + 1) % self.instruments.len();

        // Random walk with a floor to keep prices positive.
        let shock = self.normal.sample(&mut self.rng);
        let state = &mut self.instruments[idx];
        state.mid_price += state.volatility * state.mid_price * shock;
        if state.mid_price < 0.01 {
            state.mid_price = 0.01;
        }

        let half_spread = state.spread / 2.0;
        let bid = state.mid_price - half_spread;
        let ask = state.mid_price + half_spread;
        let last = state.mid_price + state.spread * 0.1 * self.normal.sample(&mut self.rng);

        let qty_factor = 1 + self.normal.sample(&mut self.rng).abs() as u64;
        let bid_qty = state.base_size * qty_factor;
        let ask_qty = state.base_size * qty_factor;
        let last_qty = state.base_size / 2;

        self.msg_count += 1;

        self.buffer.clear();
        write!(
            self.buffer,
            "8=FIX.4.4|9=200|35=W|49=FEED|56=CLIENT|34={}|\
             55={}|132={:.2}|133={:.2}|134={}|135={}|44={:.2}|38={}|10=000|",
            self.msg_count,
            self.instruments[idx].symbol,
            bid,
            ask,
            bid_qty,
            ask_qty,
            last,
            last_qty,
        )
        .expect("writing to a String cannot fail");

        &self.buffer
    }

    /// Messages generated so far.
    pub fn messages_generated(&self) -> u64 {
        self.msg_count
    }

    /// Registered instruments.
    pub fn instruments(&self) -> &[InstrumentState] {
        &self.instruments
    }
}

impl Default for FeedSimulator {
    fn default() -> Self {
        Self::new()
    }
}
