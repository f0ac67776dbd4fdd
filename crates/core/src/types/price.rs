//! Fixed-point price type for the hot path.
//!
//! [`Price`] stores a value in ticks of 1/100 of a currency unit: `150.50`
//! is `Price(15050)`. All matching, risk, and routing arithmetic stays in
//! integer ticks; conversion to `f64` exists for P&L accounting and
//! display only.

use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// Number of ticks per currency unit (two decimal places).
pub const PRICE_SCALE: i64 = 100;

/// Fixed-point price in ticks of 1/100.
///
/// # Examples
///
/// ```
/// use velo_core::types::Price;
///
/// let p = Price::from_f64(150.50);
/// assert_eq!(p.ticks(), 15050);
/// assert_eq!(p.to_f64(), 150.50);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct Price(pub i64);

impl Price {
    /// The zero price, also the "empty side" BBO sentinel.
    pub const ZERO: Price = Price(0);

    /// Create a price from raw ticks.
    #[inline]
    pub const fn from_ticks(ticks: i64) -> Self {
        Self(ticks)
    }

    /// Raw tick count.
    #[inline]
    pub const fn ticks(self) -> i64 {
        self.0
    }

    /// Returns `true` if this price is zero.
    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Absolute value.
    #[inline]
    pub const fn abs(self) -> Self {
        Self(self.0.abs())
    }

    /// Convert from a floating-point currency amount, rounding to the
    /// nearest tick. **Not for hot-path use** -- configuration, feed
    /// synthesis, and tests only.
    #[inline]
    pub fn from_f64(value: f64) -> Self {
        let scaled = value * PRICE_SCALE as f64;
        Self(if value >= 0.0 {
            (scaled + 0.5) as i64
        } else {
            (scaled - 0.5) as i64
        })
    }

    /// Convert to a floating-point currency amount. **Not for hot-path
    /// use** -- P&L, reporting, and display only.
    #[inline]
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / PRICE_SCALE as f64
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / PRICE_SCALE;
        let frac = (self.0 % PRICE_SCALE).abs();
        if self.0 < 0 && whole == 0 {
            write!(f, "-0.{:02}", frac)
        } else {
            write!(f, "{}.{:02}", whole, frac)
        }
    }
}

impl Add for Price {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Price {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl AddAssign for Price {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Price {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for Price {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_ticks_and_accessors() {
        let p = Price::from_ticks(15050);
        assert_eq!(p.ticks(), 15050);
        assert!(!p.is_zero());
    }

    #[test]
    fn test_zero() {
        assert!(Price::ZERO.is_zero());
        assert_eq!(Price::default(), Price::ZERO);
    }

    #[test]
    fn test_from_f64_rounds() {
        assert_eq!(Price::from_f64(150.50).ticks(), 15050);
        assert_eq!(Price::from_f64(150.504).ticks(), 15050);
        assert_eq!(Price::from_f64(150.506).ticks(), 15051);
    }

    #[test]
    fn test_from_f64_negative() {
        assert_eq!(Price::from_f64(-1.25).ticks(), -125);
        assert_eq!(Price::from_f64(-1.256).ticks(), -126);
    }

    #[test]
    fn test_round_trip_within_half_tick() {
        // to_f64(from_f64(x)) must be within 0.005 of x.
        for &x in &[0.0, 0.01, 1.0, 149.994, 150.0, 150.505, 99999.99, -42.42] {
            let rt = Price::from_f64(x).to_f64();
            assert!((rt - x).abs() <= 0.005, "x={x}, rt={rt}");
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Price::from_ticks(15050)), "150.50");
        assert_eq!(format!("{}", Price::from_ticks(5)), "0.05");
        assert_eq!(format!("{}", Price::from_ticks(-15050)), "-150.50");
        assert_eq!(format!("{}", Price::from_ticks(-5)), "-0.05");
    }

    #[test]
    fn test_arithmetic() {
        let a = Price::from_ticks(100);
        let b = Price::from_ticks(30);
        assert_eq!(a + b, Price::from_ticks(130));
        assert_eq!(a - b, Price::from_ticks(70));
        assert_eq!(-(a - b), Price::from_ticks(-70));
        assert_eq!((b - a).abs(), Price::from_ticks(70));
    }

    #[test]
    fn test_ordering() {
        assert!(Price::from_ticks(100) < Price::from_ticks(200));
        assert!(Price::from_ticks(-100) < Price::ZERO);
    }
}
