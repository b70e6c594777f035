//! Shared application state for Axum handlers.
//!
//! Cloned per request; everything inside is behind an `Arc`.

use std::sync::Arc;
use std::time::Instant;

use crate::audit::SharedAuditSink;
use crate::clock::SharedClock;
use crate::config::Config;
use crate::error::AppResult;
use crate::policy::AccessPolicy;

#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Destination of audit records
    pub sink: SharedAuditSink,
    /// Time source for the chain
    pub clock: SharedClock,
    /// Validated admission policy
    pub policy: Arc<AccessPolicy>,
    started_at: Instant,
}

impl AppState {
    /// Build state from `config`, validating the access policy.
    pub fn new(config: Config, sink: SharedAuditSink, clock: SharedClock) -> AppResult<Self> {
        let policy = config.access_policy()?;
        Ok(Self {
            config: Arc::new(config),
            sink,
            clock,
            policy: Arc::new(policy),
            started_at: Instant::now(),
        })
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;
    use crate::clock::SystemClock;
    use crate::error::AppError;

    #[test]
    fn test_new_rejects_invalid_window() {
        let config = Config {
            allowed_start_hour: 18,
            allowed_end_hour: 8,
            ..Config::default()
        };

        let result = AppState::new(
            config,
            Arc::new(MemoryAuditSink::new()),
            Arc::new(SystemClock),
        );
        assert!(matches!(result, Err(AppError::InvalidWindow(_))));
    }

    #[test]
    fn test_new_builds_policy() {
        let state = AppState::new(
            Config::default(),
            Arc::new(MemoryAuditSink::new()),
            Arc::new(SystemClock),
        )
        .unwrap();
        assert!(state.policy.is_bypassed("/health"));
        assert_eq!(state.uptime_seconds(), 0);
    }
}
