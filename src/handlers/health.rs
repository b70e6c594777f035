//! Health and readiness endpoints.
//!
//! # Endpoints
//!
//! - `GET /health` - Health check with audit sink counters
//! - `GET /ready` - Kubernetes-compatible readiness probe
//!
//! Both are in the default restriction bypass list, so probes keep working
//! outside the allowed window. They are still audited.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::Utc;
use tracing::instrument;

use crate::models::HealthResponse;
use crate::state::AppState;

/// Health check endpoint.
///
/// Always returns 200 OK with status details in the body.
///
/// # Response Body
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "allowed_window": "08:00-18:00",
///   "audit_records_written": 42,
///   "uptime_seconds": 3600,
///   "timestamp": "2024-01-15T10:30:00Z"
/// }
/// ```
#[instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        allowed_window: state.policy.window().to_string(),
        audit_records_written: state.sink.records_written(),
        uptime_seconds: state.uptime_seconds(),
        timestamp: Utc::now(),
    })
}

/// Readiness check endpoint for Kubernetes probes.
///
/// The audit log is opened before the listener binds, so a serving process
/// is ready.
#[instrument]
pub async fn readiness_check() -> StatusCode {
    StatusCode::OK
}
