//! Time source for the request pipeline.
//!
//! The chain stamps every request once at entry; that instant drives both the
//! access decision and the audit record. Injecting the clock keeps policy
//! tests deterministic.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Local};

/// Supplies the current local time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// Shared, type-erased clock handle.
pub type SharedClock = Arc<dyn Clock>;

/// Wall-clock time from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock frozen at a chosen instant. Can be moved with [`FixedClock::set`].
#[derive(Debug)]
pub struct FixedClock {
    instant: RwLock<DateTime<Local>>,
}

impl FixedClock {
    pub fn new(instant: DateTime<Local>) -> Self {
        Self {
            instant: RwLock::new(instant),
        }
    }

    pub fn set(&self, instant: DateTime<Local>) {
        let mut guard = self
            .instant
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = instant;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        *self
            .instant
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_fixed_clock_returns_instant() {
        let at = Local.with_ymd_and_hms(2025, 1, 15, 9, 30, 0).unwrap();
        let clock = FixedClock::new(at);
        assert_eq!(clock.now(), at);
        assert_eq!(clock.now().hour(), 9);
    }

    #[test]
    fn test_fixed_clock_set() {
        let clock = FixedClock::new(Local.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap());
        clock.set(Local.with_ymd_and_hms(2025, 1, 15, 20, 0, 0).unwrap());
        assert_eq!(clock.now().hour(), 20);
    }

    #[test]
    fn test_system_clock_is_close_to_now() {
        let diff = (Local::now() - SystemClock.now()).num_seconds().abs();
        assert!(diff < 5);
    }
}
