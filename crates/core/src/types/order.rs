//! Order tags: side, type, and lifecycle status.
//!
//! All three are `#[repr(u8)]` with fixed discriminants so the wire
//! structs embedding them have a stable byte layout.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Side {
    /// Buy / long.
    Buy = 0,
    /// Sell / short.
    Sell = 1,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "Buy"),
            Side::Sell => write!(f, "Sell"),
        }
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OrderType {
    /// Limit order; residual rests on the book.
    Limit = 0,
    /// Market order; fills at the best available prices.
    Market = 1,
    /// Immediate-or-cancel; marketable portion fills, residual is dropped.
    Ioc = 2,
    /// Fill-or-kill; fills completely or not at all.
    Fok = 3,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Limit => write!(f, "Limit"),
            OrderType::Market => write!(f, "Market"),
            OrderType::Ioc => write!(f, "IOC"),
            OrderType::Fok => write!(f, "FOK"),
        }
    }
}

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OrderStatus {
    /// Accepted, no fills yet.
    New = 0,
    /// Some quantity filled, some remains.
    PartiallyFilled = 1,
    /// Fully filled; terminal.
    Filled = 2,
    /// Cancelled; terminal.
    Cancelled = 3,
    /// Rejected; terminal.
    Rejected = 4,
}

impl OrderStatus {
    /// Returns `true` if no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Filled | Self::Cancelled | Self::Rejected)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::New => write!(f, "New"),
            OrderStatus::PartiallyFilled => write!(f, "PartiallyFilled"),
            OrderStatus::Filled => write!(f, "Filled"),
            OrderStatus::Cancelled => write!(f, "Cancelled"),
            OrderStatus::Rejected => write!(f, "Rejected"),
        }
    }
}
