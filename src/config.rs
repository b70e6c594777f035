//! Application configuration loaded from environment variables.
//!
//! # Configuration Hierarchy
//!
//! All configuration is loaded from environment variables with sensible defaults
//! for development. In production, configure via environment variables or a `.env` file.
//! Configuration is read once at startup and never reloaded.
//!
//! # Access Window
//!
//! - `ALLOWED_START_HOUR`: First hour of the day requests are accepted (default: 8)
//! - `ALLOWED_END_HOUR`: Hour at which requests stop being accepted (default: 18)
//! - `RESTRICTION_BYPASS_PATHS`: Paths never time-restricted (default: `/health,/ready`)
//!
//! # Audit Log
//!
//! - `AUDIT_LOG_DIR`: Directory of the audit log (default: `logs`)
//! - `AUDIT_LOG_FILE`: File name of the audit log (default: `requests.log`)
//! - `AUDIT_LOG_FORMAT`: `text` or `json` (default: `text`)
//! - `IDENTITY_HEADER`: Trusted header naming the caller (default:
//!   `x-authenticated-user`, empty disables)

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use axum::http::HeaderName;

use crate::audit::AuditFormat;
use crate::error::{AppError, AppResult};
use crate::middleware::DEFAULT_IDENTITY_HEADER;
use crate::policy::{
    AccessPolicy, AllowedWindow, DEFAULT_BYPASS_PATHS, DEFAULT_END_HOUR, DEFAULT_START_HOUR,
};
use crate::validation::{validate_bypass_path, validate_header_name};

/// Output format of the operational (tracing) log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}' (expected pretty or json)")),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Pretty => "pretty",
            Self::Json => "json",
        })
    }
}

/// Application configuration loaded from environment variables.
///
/// # Example
///
/// ```rust,ignore
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.server_addr());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Server host address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 3000)
    pub port: u16,

    // =========================================================================
    // Access Window Configuration
    // =========================================================================
    /// First allowed hour, inclusive (default: 8)
    pub allowed_start_hour: u8,

    /// End of the allowed window, exclusive (default: 18)
    pub allowed_end_hour: u8,

    /// Paths exempt from the time restriction. They are still audited.
    pub restriction_bypass_paths: Vec<String>,

    // =========================================================================
    // Audit Configuration
    // =========================================================================
    pub audit_log_dir: PathBuf,

    pub audit_log_file: String,

    pub audit_log_format: AuditFormat,

    /// Header set by the fronting auth proxy with the caller's name.
    /// `None` disables it and every caller is recorded as anonymous.
    pub identity_header: Option<String>,

    // =========================================================================
    // Observability Configuration
    // =========================================================================
    /// Log level (e.g., "info", "debug", "trace")
    pub log_level: String,

    pub log_format: LogFormat,

    /// Port for Prometheus metrics endpoint (default: 9090, 0 = disabled)
    pub metrics_port: u16,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` or `AppError::InvalidWindow` if any
    /// value is malformed or inconsistent.
    pub fn from_env() -> AppResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let config = Self {
            // Server
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: Self::parse_env("PORT", 3000)?,

            // Access window
            allowed_start_hour: Self::parse_env("ALLOWED_START_HOUR", DEFAULT_START_HOUR)?,
            allowed_end_hour: Self::parse_env("ALLOWED_END_HOUR", DEFAULT_END_HOUR)?,
            restriction_bypass_paths: Self::parse_bypass_paths(),

            // Audit
            audit_log_dir: env::var("AUDIT_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("logs")),
            audit_log_file: env::var("AUDIT_LOG_FILE")
                .unwrap_or_else(|_| "requests.log".to_string()),
            audit_log_format: Self::parse_env("AUDIT_LOG_FORMAT", AuditFormat::Text)?,
            identity_header: Self::parse_identity_header(),

            // Observability
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            log_format: Self::parse_env("LOG_FORMAT", LogFormat::Pretty)?,
            metrics_port: Self::parse_env("METRICS_PORT", 9090)?,
        };

        // Validate configuration before returning
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values for consistency and correctness.
    pub fn validate(&self) -> AppResult<()> {
        self.allowed_window()?;

        for path in &self.restriction_bypass_paths {
            validate_bypass_path(path)?;
        }

        if self.audit_log_file.trim().is_empty() {
            return Err(AppError::ConfigError(
                "AUDIT_LOG_FILE must not be empty".to_string(),
            ));
        }

        self.identity_header()?;

        Ok(())
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The configured window, validated.
    pub fn allowed_window(&self) -> AppResult<AllowedWindow> {
        Ok(AllowedWindow::new(
            self.allowed_start_hour,
            self.allowed_end_hour,
        )?)
    }

    pub fn access_policy(&self) -> AppResult<AccessPolicy> {
        Ok(AccessPolicy::new(
            self.allowed_window()?,
            self.restriction_bypass_paths.clone(),
        ))
    }

    pub fn audit_log_path(&self) -> PathBuf {
        self.audit_log_dir.join(&self.audit_log_file)
    }

    /// Parsed identity header, if enabled.
    pub fn identity_header(&self) -> AppResult<Option<HeaderName>> {
        self.identity_header
            .as_deref()
            .map(validate_header_name)
            .transpose()
    }

    /// Check if Prometheus metrics export is enabled.
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_port > 0
    }

    /// Get the metrics endpoint address.
    ///
    /// Returns `None` if metrics are disabled (port = 0).
    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        if self.metrics_enabled() {
            Some(SocketAddr::from(([0, 0, 0, 0], self.metrics_port)))
        } else {
            None
        }
    }

    /// Parse an environment variable into the specified type with a default value.
    fn parse_env<T>(name: &str, default: T) -> AppResult<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match env::var(name) {
            Ok(val) => val
                .trim()
                .parse()
                .map_err(|e| AppError::ConfigError(format!("Invalid {name}: {e}"))),
            Err(_) => Ok(default),
        }
    }

    /// Parse restriction bypass paths from environment variable.
    ///
    /// An explicitly empty value disables bypassing entirely.
    fn parse_bypass_paths() -> Vec<String> {
        match env::var("RESTRICTION_BYPASS_PATHS") {
            Ok(raw) => split_list(&raw),
            Err(_) => DEFAULT_BYPASS_PATHS.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    fn parse_identity_header() -> Option<String> {
        match env::var("IDENTITY_HEADER") {
            Ok(raw) => Some(raw.trim().to_string()).filter(|h| !h.is_empty()),
            Err(_) => Some(DEFAULT_IDENTITY_HEADER.to_string()),
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Default configuration for testing and development.
///
/// Production deployments should use `Config::from_env()` instead.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Server
            host: "0.0.0.0".to_string(),
            port: 3000,
            // Access window
            allowed_start_hour: DEFAULT_START_HOUR,
            allowed_end_hour: DEFAULT_END_HOUR,
            restriction_bypass_paths: DEFAULT_BYPASS_PATHS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            // Audit
            audit_log_dir: PathBuf::from("logs"),
            audit_log_file: "requests.log".to_string(),
            audit_log_format: AuditFormat::Text,
            identity_header: Some(DEFAULT_IDENTITY_HEADER.to_string()),
            // Observability
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_port: 9090,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::validation::normalize_path;

    #[test]
    fn test_default_config_values() {
        let config = Config::default();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.allowed_start_hour, 8);
        assert_eq!(config.allowed_end_hour, 18);
        assert_eq!(config.restriction_bypass_paths, vec!["/health", "/ready"]);
        assert_eq!(config.audit_log_path(), PathBuf::from("logs/requests.log"));
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_server_addr_format() {
        let config = Config {
            host: "localhost".to_string(),
            port: 3000,
            ..Config::default()
        };

        assert_eq!(config.server_addr(), "localhost:3000");
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_overnight_window() {
        let config = Config {
            allowed_start_hour: 22,
            allowed_end_hour: 6,
            ..Config::default()
        };

        let result = config.validate();
        assert!(matches!(result, Err(AppError::InvalidWindow(_))));
    }

    #[test]
    fn test_validate_rejects_out_of_range_hour() {
        let config = Config {
            allowed_end_hour: 25,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_relative_bypass_path() {
        let config = Config {
            restriction_bypass_paths: vec!["health".to_string()],
            ..Config::default()
        };

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("must start with '/'"));
    }

    #[test]
    fn test_validate_rejects_bad_identity_header() {
        let config = Config {
            identity_header: Some("bad header".to_string()),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_log_file() {
        let config = Config {
            audit_log_file: "  ".to_string(),
            ..Config::default()
        };

        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("AUDIT_LOG_FILE"));
    }

    #[test]
    fn test_identity_header_disabled() {
        let config = Config {
            identity_header: None,
            ..Config::default()
        };
        assert!(config.identity_header().unwrap().is_none());
    }

    #[test]
    fn test_access_policy_uses_config() {
        let config = Config {
            allowed_start_hour: 0,
            allowed_end_hour: 24,
            restriction_bypass_paths: vec![],
            ..Config::default()
        };

        let policy = config.access_policy().unwrap();
        assert_eq!(policy.window().start_hour(), 0);
        assert_eq!(policy.window().end_hour(), 24);
        assert!(!policy.is_bypassed("/health"));
    }

    #[test]
    fn test_configured_bypass_paths_match_normalised_requests() {
        let config = Config {
            restriction_bypass_paths: vec!["//health".to_string()],
            ..Config::default()
        };
        assert!(config.validate().is_ok());

        let policy = config.access_policy().unwrap();
        assert!(policy.is_bypassed(&normalize_path("//health")));
    }

    #[test]
    fn test_metrics_addr() {
        assert_eq!(
            Config::default().metrics_addr(),
            Some(SocketAddr::from(([0, 0, 0, 0], 9090)))
        );
        let config = Config {
            metrics_port: 0,
            ..Config::default()
        };
        assert!(config.metrics_addr().is_none());
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(" /a, ,/b "), vec!["/a", "/b"]);
        assert!(split_list("").is_empty());
    }
}
