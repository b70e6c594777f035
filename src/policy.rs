//! Time-window admission policy.
//!
//! # Rule
//!
//! A request is admitted iff the local hour at which it entered the chain
//! falls inside the half-open window `[start_hour, end_hour)`. Minutes and
//! seconds are not consulted: with the default window `08..18`, 17:59 is
//! admitted and 18:00 is not.
//!
//! Overnight windows (`start >= end`) are rejected at construction time
//! rather than interpreted as wrapping past midnight.
//!
//! # Bypass Paths
//!
//! Paths listed in the policy's bypass set are never restricted. They use
//! **exact string matching** against the normalised request path, the same
//! way health endpoints bypass API key checks: `/health` is bypassed,
//! `/health/` and `/HEALTH` are not.

use std::fmt;

use chrono::Timelike;
use thiserror::Error;

use crate::validation::{MAX_END_HOUR, MAX_START_HOUR, normalize_path};

/// Default first admitted hour.
pub const DEFAULT_START_HOUR: u8 = 8;

/// Default first rejected hour.
pub const DEFAULT_END_HOUR: u8 = 18;

/// Paths that skip the time restriction by default (liveness/readiness probes).
pub const DEFAULT_BYPASS_PATHS: [&str; 2] = ["/health", "/ready"];

/// Why an [`AllowedWindow`] could not be built.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowError {
    #[error("start hour {0} is out of range (0-23)")]
    StartOutOfRange(u8),

    #[error("end hour {0} is out of range (1-24)")]
    EndOutOfRange(u8),

    #[error(
        "start hour {start} must be earlier than end hour {end}; overnight windows are not supported"
    )]
    NotIncreasing { start: u8, end: u8 },
}

/// The half-open interval of local hours during which requests are admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AllowedWindow {
    start_hour: u8,
    end_hour: u8,
}

impl AllowedWindow {
    /// Build a window, rejecting out-of-range hours and overnight spans.
    pub fn new(start_hour: u8, end_hour: u8) -> Result<Self, WindowError> {
        if start_hour > MAX_START_HOUR {
            return Err(WindowError::StartOutOfRange(start_hour));
        }
        if end_hour == 0 || end_hour > MAX_END_HOUR {
            return Err(WindowError::EndOutOfRange(end_hour));
        }
        if start_hour >= end_hour {
            return Err(WindowError::NotIncreasing {
                start: start_hour,
                end: end_hour,
            });
        }
        Ok(Self {
            start_hour,
            end_hour,
        })
    }

    pub fn start_hour(&self) -> u8 {
        self.start_hour
    }

    pub fn end_hour(&self) -> u8 {
        self.end_hour
    }

    /// Whether `hour` (0-23) lies in `[start_hour, end_hour)`.
    #[inline]
    pub fn contains(&self, hour: u32) -> bool {
        u32::from(self.start_hour) <= hour && hour < u32::from(self.end_hour)
    }
}

impl Default for AllowedWindow {
    fn default() -> Self {
        Self {
            start_hour: DEFAULT_START_HOUR,
            end_hour: DEFAULT_END_HOUR,
        }
    }
}

impl fmt::Display for AllowedWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:00-{:02}:00", self.start_hour, self.end_hour)
    }
}

/// Reason attached to a denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    OutsideAllowedHours { hour: u32 },
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::OutsideAllowedHours { .. } => f.write_str("outside allowed hours"),
        }
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Decide admission for the instant `now` against `window`.
///
/// Pure: only the hour component of `now` is read.
pub fn decide<T: Timelike>(now: &T, window: &AllowedWindow) -> Decision {
    let hour = now.hour();
    if window.contains(hour) {
        Decision::Allow
    } else {
        Decision::Deny(DenyReason::OutsideAllowedHours { hour })
    }
}

/// Admission policy: an allowed window plus paths exempt from it.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    window: AllowedWindow,
    bypass_paths: Vec<String>,
}

impl AccessPolicy {
    /// Bypass paths are normalised the same way request paths are.
    pub fn new(window: AllowedWindow, bypass_paths: Vec<String>) -> Self {
        Self {
            window,
            bypass_paths: bypass_paths.iter().map(|p| normalize_path(p)).collect(),
        }
    }

    /// Policy with [`DEFAULT_BYPASS_PATHS`].
    pub fn with_defaults(window: AllowedWindow) -> Self {
        Self::new(
            window,
            DEFAULT_BYPASS_PATHS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        )
    }

    pub fn window(&self) -> &AllowedWindow {
        &self.window
    }

    pub fn is_bypassed(&self, path: &str) -> bool {
        self.bypass_paths.iter().any(|p| p == path)
    }

    /// See [`decide`].
    pub fn decide<T: Timelike>(&self, now: &T) -> Decision {
        decide(now, &self.window)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn at(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    #[test]
    fn test_default_window_boundaries() {
        let window = AllowedWindow::default();

        assert_eq!(decide(&at(8, 0), &window), Decision::Allow);
        assert_eq!(decide(&at(17, 0), &window), Decision::Allow);
        assert_eq!(
            decide(&at(18, 0), &window),
            Decision::Deny(DenyReason::OutsideAllowedHours { hour: 18 })
        );
        assert!(!decide(&at(7, 0), &window).is_allowed());
        assert!(!decide(&at(23, 0), &window).is_allowed());
    }

    #[test]
    fn test_every_hour_matches_half_open_interval() {
        let window = AllowedWindow::new(8, 18).unwrap();
        for hour in 0..24 {
            let expected = (8..18).contains(&hour);
            assert_eq!(
                decide(&at(hour, 0), &window).is_allowed(),
                expected,
                "hour {hour}"
            );
        }
    }

    #[test]
    fn test_minutes_are_ignored() {
        let window = AllowedWindow::default();
        assert!(decide(&at(17, 59), &window).is_allowed());
        assert!(!decide(&at(7, 59), &window).is_allowed());
    }

    #[test]
    fn test_full_day_window() {
        let window = AllowedWindow::new(0, 24).unwrap();
        for hour in 0..24 {
            assert!(decide(&at(hour, 0), &window).is_allowed());
        }
    }

    #[test]
    fn test_overnight_window_rejected() {
        assert_eq!(
            AllowedWindow::new(22, 6),
            Err(WindowError::NotIncreasing { start: 22, end: 6 })
        );
        assert_eq!(
            AllowedWindow::new(9, 9),
            Err(WindowError::NotIncreasing { start: 9, end: 9 })
        );
    }

    #[test]
    fn test_out_of_range_hours_rejected() {
        assert_eq!(
            AllowedWindow::new(24, 24),
            Err(WindowError::StartOutOfRange(24))
        );
        assert_eq!(AllowedWindow::new(0, 25), Err(WindowError::EndOutOfRange(25)));
        assert_eq!(AllowedWindow::new(0, 0), Err(WindowError::EndOutOfRange(0)));
    }

    #[test]
    fn test_deny_reason_display() {
        let reason = DenyReason::OutsideAllowedHours { hour: 20 };
        assert_eq!(reason.to_string(), "outside allowed hours");
    }

    #[test]
    fn test_window_display() {
        assert_eq!(AllowedWindow::default().to_string(), "08:00-18:00");
    }

    #[test]
    fn test_bypass_paths_exact_match() {
        let policy = AccessPolicy::with_defaults(AllowedWindow::default());
        assert!(policy.is_bypassed("/health"));
        assert!(policy.is_bypassed("/ready"));
        assert!(!policy.is_bypassed("/health/"));
        assert!(!policy.is_bypassed("/HEALTH"));
        assert!(!policy.is_bypassed("/home"));
    }

    #[test]
    fn test_bypass_paths_are_normalised() {
        let policy = AccessPolicy::new(
            AllowedWindow::default(),
            vec!["//health".to_string(), "/status//live".to_string()],
        );
        assert!(policy.is_bypassed("/health"));
        assert!(policy.is_bypassed("/status/live"));
    }
}
