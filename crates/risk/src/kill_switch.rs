//! Kill switch: the global trading halt.
//!
//! The active flag is an `AtomicBool` — release on write, acquire on read
//! — and is the only cross-thread mutable datum in the risk subsystem, so
//! the switch is shared as `Arc<KillSwitch>`. The trigger reason sits
//! behind a `parking_lot::Mutex` since it is only written during
//! exceptional events and read for reporting.
//!
//! Drawdown monitoring lives in [`RiskGate`](crate::RiskGate), which owns
//! the single-threaded peak-P&L state and activates the switch when the
//! limit is breached.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

/// Global trading halt. When active, the risk gate rejects every order.
pub struct KillSwitch {
    active: AtomicBool,
    trigger_reason: Mutex<Option<String>>,
}

impl KillSwitch {
    /// Create an inactive kill switch.
    pub fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            trigger_reason: Mutex::new(None),
        }
    }

    /// Returns `true` if trading is halted. Single acquire load; safe on
    /// the hot path.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Halt all trading, recording the reason.
    pub fn activate(&self, reason: &str) {
        self.active.store(true, Ordering::Release);
        tracing::error!(reason, "KILL SWITCH ACTIVATED — all orders will be rejected");
        *self.trigger_reason.lock() = Some(reason.to_string());
    }

    /// Re-enable trading.
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
        tracing::warn!("kill switch deactivated — trading re-enabled");
        *self.trigger_reason.lock() = None;
    }

    /// The reason the switch was last activated, if any.
    pub fn trigger_reason(&self) -> Option<String> {
        self.trigger_reason.lock().clone()
    }
}

impl Default for KillSwitch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initially_inactive() {
        let ks = KillSwitch::new();
        assert!(!ks.is_active());
        assert!(ks.trigger_reason().is_none());
    }

    #[test]
    fn test_activate_and_deactivate() {
        let ks = KillSwitch::new();
        ks.activate("manual");
        assert!(ks.is_active());
        assert_eq!(ks.trigger_reason().as_deref(), Some("manual"));
        ks.deactivate();
        assert!(!ks.is_active());
        assert!(ks.trigger_reason().is_none());
    }

    #[test]
    fn test_repeated_activation_keeps_latest_reason() {
        let ks = KillSwitch::new();
        ks.activate("first");
        ks.activate("second");
        assert!(ks.is_active());
        assert_eq!(ks.trigger_reason().as_deref(), Some("second"));
    }

    #[test]
    fn test_cross_thread_visibility() {
        use std::sync::Arc;
        let ks = Arc::new(KillSwitch::new());
        let ks2 = Arc::clone(&ks);
        let handle = std::thread::spawn(move || {
            ks2.activate("from other thread");
        });
        handle.join().unwrap();
        assert!(ks.is_active());
    }
}
