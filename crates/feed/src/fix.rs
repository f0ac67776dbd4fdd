//! Zero-copy FIX message view.
//!
//! Fields are pipe-delimited `tag=value` pairs (`|` standing in for SOH
//! so messages stay printable). Parsing produces a [`FixMessage`] whose
//! field values borrow the original buffer; nothing is copied. Tags below
//! 128 go into a flat array for O(1) lookup, larger tags into a small
//! linear-scan overflow table.

use velo_core::types::{OrderId, OrderType, Price, Qty, Side};

/// Flat-lookup bound: tags below this use the O(1) array.
const MAX_COMMON_TAGS: usize = 128;

/// Overflow capacity for tags >= 128.
const MAX_EXTRA_FIELDS: usize = 32;

/// A parsed FIX message borrowing the input buffer.
pub struct FixMessage<'a> {
    common: [Option<&'a str>; MAX_COMMON_TAGS],
    extra: [Option<(u32, &'a str)>; MAX_EXTRA_FIELDS],
    extra_len: usize,
}

impl<'a> FixMessage<'a> {
    /// Parse a message. Returns `None` for anything malformed: missing
    /// `8=FIX` preamble, missing message type, or a field without `=`.
    pub fn parse(message: &'a str) -> Option<Self> {
        if !message.starts_with("8=FIX") {
            return None;
        }

        let mut msg = Self {
            common: [None; MAX_COMMON_TAGS],
            extra: [None; MAX_EXTRA_FIELDS],
            extra_len: 0,
        };

        for field in message.split('|') {
            if field.is_empty() {
                continue;
            }
            let (tag, value) = field.split_once('=')?;
            let tag: u32 = tag.parse().ok()?;

            if (tag as usize) < MAX_COMMON_TAGS {
                msg.common[tag as usize] = Some(value);
            } else if msg.extra_len < MAX_EXTRA_FIELDS {
                msg.extra[msg.extra_len] = Some((tag, value));
                msg.extra_len += 1;
            }
            // Tags beyond the overflow capacity are ignored.
        }

        // A message without a type is useless downstream.
        msg.common[35]?;
        Some(msg)
    }

    /// Raw field value by tag, if present.
    pub fn get(&self, tag: u32) -> Option<&'a str> {
        if (tag as usize) < MAX_COMMON_TAGS {
            return self.common[tag as usize];
        }
        self.extra[..self.extra_len]
            .iter()
            .flatten()
            .find(|(t, _)| *t == tag)
            .map(|(_, v)| *v)
    }

    /// Message type (tag 35).
    pub fn msg_type(&self) -> &'a str {
        // Presence is checked at parse time.
        self.common[35].unwrap_or("")
    }

    /// Client order id (tag 11).
    pub fn order_id(&self) -> Option<OrderId> {
        self.get(11)?.parse().ok()
    }

    /// Symbol (tag 55).
    pub fn symbol(&self) -> Option<&'a str> {
        self.get(55)
    }

    /// Side (tag 54): `1` = Buy, `2` = Sell.
    pub fn side(&self) -> Option<Side> {
        match self.get(54)? {
            "1" => Some(Side::Buy),
            "2" => Some(Side::Sell),
            _ => None,
        }
    }

    /// Order type (tag 40): `1` = Market, `2` = Limit.
    pub fn order_type(&self) -> Option<OrderType> {
        match self.get(40)? {
            "1" => Some(OrderType::Market),
            "2" => Some(OrderType::Limit),
            _ => None,
        }
    }

    /// Price (tag 44).
    pub fn price(&self) -> Option<Price> {
        parse_price(self.get(44)?)
    }

    /// Quantity (tag 38).
    pub fn quantity(&self) -> Option<Qty> {
        self.get(38)?.parse().ok()
    }

    /// Bid price (tag 132).
    pub fn bid_price(&self) -> Option<Price> {
        parse_price(self.get(132)?)
    }

    /// Ask price (tag 133).
    pub fn ask_price(&self) -> Option<Price> {
        parse_price(self.get(133)?)
    }

    /// Bid size (tag 134).
    pub fn bid_size(&self) -> Option<Qty> {
        self.get(134)?.parse().ok()
    }

    /// Ask size (tag 135).
    pub fn ask_size(&self) -> Option<Qty> {
        self.get(135)?.parse().ok()
    }
}

/// Parse a decimal price string into fixed-point ticks without going
/// through floating point: "150.50" -> 15050, "150.5" -> 15050,
/// "150" -> 15000.
fn parse_price(s: &str) -> Option<Price> {
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1i64, rest),
        None => (1i64, s),
    };

    let (whole, frac) = match digits.split_once('.') {
        Some((w, f)) => (w, f),
        None => (digits, ""),
    };

    let whole: i64 = whole.parse().ok()?;

    let frac_ticks: i64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().ok()? * 10,
        _ => {
            // Truncate beyond two decimal places.
            frac.get(..2)?.parse().ok()?
        }
    };

    Some(Price::from_ticks(sign * (whole * 100 + frac_ticks)))
}
