//! Market-data handler: FIX text in, normalized messages out.
//!
//! Parses each raw message, maps it onto a
//! [`MarketDataMessage`](velo_core::types::MarketDataMessage) keyed by the
//! FIX type byte (`W` snapshot, `8` execution, `D` new-order-single), and
//! pushes it onto the market-data SPSC producer. Unknown message types
//! and parse failures are dropped before the queue; a full queue drops
//! the message and bumps the drop counter.

use velo_containers::Producer;
use velo_core::types::{InstrumentId, MarketDataMessage, Price, Timestamp, MAX_INSTRUMENTS};

use crate::fix::FixMessage;

/// Normalizes parsed FIX into queue messages.
pub struct MarketDataHandler {
    output: Producer<MarketDataMessage>,
    messages_processed: u64,
    messages_dropped: u64,
}

impl MarketDataHandler {
    /// Create a handler writing to the given queue producer.
    pub fn new(output: Producer<MarketDataMessage>) -> Self {
        Self {
            output,
            messages_processed: 0,
            messages_dropped: 0,
        }
    }

    /// Parse and enqueue one raw message.
    ///
    /// Returns `true` if the message reached the queue. Invalid input and
    /// unsupported message types return `false` without touching the
    /// queue; a full queue counts as a drop.
    pub fn process_message(&mut self, raw: &str) -> bool {
        let Some(msg) = FixMessage::parse(raw) else {
            self.messages_dropped += 1;
            return false;
        };

        let mut md = MarketDataMessage {
            timestamp: Timestamp::now(),
            ..Default::default()
        };

        match msg.msg_type() {
            "W" => {
                md.msg_type = b'W';
                md.instrument = Self::symbol_to_id(msg.symbol().unwrap_or(""));
                md.bid_price = msg.bid_price().unwrap_or(Price::ZERO);
                md.ask_price = msg.ask_price().unwrap_or(Price::ZERO);
                md.bid_quantity = msg.bid_size().unwrap_or(0);
                md.ask_quantity = msg.ask_size().unwrap_or(0);
                md.last_price = msg.price().unwrap_or(Price::ZERO);
                md.last_quantity = msg.quantity().unwrap_or(0);
            }
            "8" => {
                md.msg_type = b'8';
                md.instrument = Self::symbol_to_id(msg.symbol().unwrap_or(""));
                md.last_price = msg.price().unwrap_or(Price::ZERO);
                md.last_quantity = msg.quantity().unwrap_or(0);
            }
            "D" => {
                md.msg_type = b'D';
                md.instrument = Self::symbol_to_id(msg.symbol().unwrap_or(""));
                md.last_price = msg.price().unwrap_or(Price::ZERO);
                md.last_quantity = msg.quantity().unwrap_or(0);
            }
            other => {
                tracing::trace!(msg_type = other, "dropping unsupported FIX message type");
                self.messages_dropped += 1;
                return false;
            }
        }

        if self.output.try_push(md) {
            self.messages_processed += 1;
            true
        } else {
            self.messages_dropped += 1;
            false
        }
    }

    /// Messages successfully enqueued.
    pub fn messages_processed(&self) -> u64 {
        self.messages_processed
    }

    /// Messages dropped (parse failure, unknown type, or full queue).
    pub fn messages_dropped(&self) -> u64 {
        self.messages_dropped
    }

    /// Map an instrument symbol to a dense id.
    ///
    /// Known symbols get stable ids; anything else hashes into the
    /// instrument id space.
    pub fn symbol_to_id(symbol: &str) -> InstrumentId {
        match symbol {
            "AAPL" => 0,
            "GOOG" => 1,
            "MSFT" => 2,
            "AMZN" => 3,
            "TSLA" => 4,
            _ => {
                let mut hash: u32 = 0;
                for b in symbol.bytes() {
                    hash = hash.wrapping_mul(31).wrapping_add(b as u32);
                }
                hash % MAX_INSTRUMENTS as u32
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use velo_containers::{spsc_ring, Consumer};

    fn setup() -> (MarketDataHandler, Consumer<MarketDataMessage>) {
        let (tx, rx) = spsc_ring(16);
        (MarketDataHandler::new(tx), rx)
    }

    const SNAPSHOT: &str = "8=FIX.4.4|9=200|35=W|49=FEED|56=CLIENT|34=1|\
                            55=AAPL|132=150.25|133=150.35|134=500|135=600|44=150.30|38=250|10=000|";

    #[test]
    fn test_snapshot_is_normalized_and_enqueued() {
        let (mut handler, mut rx) = setup();
        assert!(handler.process_message(SNAPSHOT));
        assert_eq!(handler.messages_processed(), 1);

        let md = rx.try_pop().expect("message on queue");
        assert_eq!(md.msg_type, b'W');
        assert_eq!(md.instrument, 0);
        assert_eq!(md.bid_price, Price::from_ticks(15_025));
        assert_eq!(md.ask_price, Price::from_ticks(15_035));
        assert_eq!(md.bid_quantity, 500);
        assert_eq!(md.ask_quantity, 600);
        assert_eq!(md.last_price, Price::from_ticks(15_030));
        assert_eq!(md.last_quantity, 250);
        assert!(md.timestamp.as_nanos() > 0);
    }

    #[test]
    fn test_execution_report_message() {
        let (mut handler, mut rx) = setup();
        let raw = "8=FIX.4.4|35=8|55=GOOG|44=280.50|38=10|";
        assert!(handler.process_message(raw));
        let md = rx.try_pop().unwrap();
        assert_eq!(md.msg_type, b'8');
        assert_eq!(md.instrument, 1);
        assert_eq!(md.last_price, Price::from_ticks(28_050));
        assert_eq!(md.last_quantity, 10);
        // Quote fields untouched for non-snapshot types.
        assert!(md.bid_price.is_zero());
    }

    #[test]
    fn test_new_order_single_message() {
        let (mut handler, mut rx) = setup();
        let raw = "8=FIX.4.4|35=D|55=MSFT|44=99.99|38=7|";
        assert!(handler.process_message(raw));
        let md = rx.try_pop().unwrap();
        assert_eq!(md.msg_type, b'D');
        assert_eq!(md.instrument, 2);
    }

    #[test]
    fn test_unknown_type_dropped_before_queue() {
        let (mut handler, mut rx) = setup();
        assert!(!handler.process_message("8=FIX.4.4|35=A|55=AAPL|"));
        assert_eq!(handler.messages_dropped(), 1);
        assert!(rx.try_pop().is_none());
    }

    #[test]
    fn test_malformed_message_dropped() {
        let (mut handler, mut rx) = setup();
        assert!(!handler.process_message("not fix at all"));
        assert!(!handler.process_message("8=FIX.4.4|broken"));
        assert_eq!(handler.messages_dropped(), 2);
        assert_eq!(handler.messages_processed(), 0);
        assert!(rx.try_pop().is_none());
    }

    #[test]
    fn test_full_queue_counts_drop() {
        let (tx, mut rx) = spsc_ring(2); // usable capacity 1
        let mut handler = MarketDataHandler::new(tx);
        assert!(handler.process_message(SNAPSHOT));
        assert!(!handler.process_message(SNAPSHOT));
        assert_eq!(handler.messages_processed(), 1);
        assert_eq!(handler.messages_dropped(), 1);

        // Draining makes room again.
        assert!(rx.try_pop().is_some());
        assert!(handler.process_message(SNAPSHOT));
    }

    #[test]
    fn test_symbol_to_id_known_and_hashed() {
        assert_eq!(MarketDataHandler::symbol_to_id("AAPL"), 0);
        assert_eq!(MarketDataHandler::symbol_to_id("TSLA"), 4);
        let id = MarketDataHandler::symbol_to_id("UNKNOWN");
        assert!((id as usize) < MAX_INSTRUMENTS);
        // Hashing is stable.
        assert_eq!(id, MarketDataHandler::symbol_to_id("UNKNOWN"));
    }
}
