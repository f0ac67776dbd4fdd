//! Nanosecond-precision monotonic timestamps.
//!
//! [`Timestamp`] wraps a `u64` nanosecond count read from
//! `CLOCK_MONOTONIC`. There is no wall-clock dependency anywhere on the
//! hot path: values are only compared and subtracted, never formatted as
//! calendar time.

use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// Monotonic nanosecond timestamp.
///
/// Strictly non-decreasing when read repeatedly on a single thread.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Capture the current monotonic time.
    ///
    /// Uses `clock_gettime(CLOCK_MONOTONIC)` on Unix platforms for
    /// sub-microsecond overhead, independent of NTP adjustments. Falls
    /// back to `std::time::Instant` elsewhere.
    #[inline]
    pub fn now() -> Self {
        #[cfg(unix)]
        {
            Self(monotonic_nanos())
        }
        #[cfg(not(unix))]
        {
            use std::sync::OnceLock;
            use std::time::Instant;
            static START: OnceLock<Instant> = OnceLock::new();
            let start = START.get_or_init(Instant::now);
            Self(start.elapsed().as_nanos() as u64)
        }
    }

    /// Raw nanosecond value.
    #[inline]
    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    /// Create a timestamp from milliseconds.
    #[inline]
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms * 1_000_000)
    }

    /// Nanoseconds elapsed from `earlier` to `self`, saturating at zero.
    #[inline]
    pub const fn elapsed_since(self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.0 / 1_000_000_000, self.0 % 1_000_000_000)
    }
}

impl Add<u64> for Timestamp {
    type Output = Self;

    #[inline]
    fn add(self, nanos: u64) -> Self {
        Self(self.0 + nanos)
    }
}

impl Sub for Timestamp {
    type Output = u64;

    #[inline]
    fn sub(self, rhs: Self) -> u64 {
        self.0.saturating_sub(rhs.0)
    }
}

#[cfg(unix)]
fn monotonic_nanos() -> u64 {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: passing a valid pointer to a stack-allocated timespec.
    unsafe {
        libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts);
    }
    ts.tv_sec as u64 * 1_000_000_000 + ts.tv_nsec as u64
}
