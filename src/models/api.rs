use chrono::{DateTime, Local, Utc};
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service health status
    pub status: String,
    /// Service version
    pub version: String,
    /// Allowed window, e.g. "08:00-18:00"
    pub allowed_window: String,
    /// Records the audit sink has accepted since startup
    pub audit_records_written: u64,
    pub uptime_seconds: u64,
    /// Current timestamp
    pub timestamp: DateTime<Utc>,
}

/// What the pipeline resolved about the caller.
#[derive(Debug, Serialize)]
pub struct WhoAmIResponse {
    pub actor: String,
    pub source_address: String,
    pub request_id: String,
    pub received_at: DateTime<Local>,
}
