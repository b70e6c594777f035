//! Application routing configuration with middleware stack.
//!
//! # Middleware Stack
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │     Tracing      │ ← HTTP request/response span with request_id
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │  Identity Header │ ← Trusted proxy header → Identity extension
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │   Error Handler  │ ← Upstream faults → 500 JSON (already audited)
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │  Request Logging │ ← One audit record per request
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │ Time Restriction │ ← 403 outside the window (bypassed for /health, /ready)
//! └────────┬─────────┘
//!          │
//!          ▼
//!      Handler
//! ```
//!
//! # Routes
//!
//! - `/`, `/home` - Greeting for the resolved actor
//! - `/whoami` - The caller as the pipeline resolved it
//! - `/health`, `/ready` - Health & monitoring (never time-restricted)
//! - anything else - 404, still audited

use axum::Router;
use axum::body::Body;
use axum::error_handling::HandleErrorLayer;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, info_span};

use crate::chain::{BoxError, Chain};
use crate::error::{AppError, AppResult};
use crate::handlers;
use crate::middleware::IdentityHeaderLayer;
use crate::state::AppState;

/// Build the application router with all routes and middleware configured.
///
/// # Errors
///
/// Returns `AppError::ConfigError` if the identity header is not a valid
/// header name.
pub fn build_router(state: AppState) -> AppResult<Router> {
    let identity_header = state.config.identity_header()?;
    match &identity_header {
        Some(name) => info!(header = %name, "Trusted identity header enabled"),
        None => info!("Identity header disabled, all callers recorded as anonymous"),
    }

    let chain = Chain::standard(
        state.clock.clone(),
        state.sink.clone(),
        state.policy.as_ref().clone(),
    );
    info!(
        window = %state.policy.window(),
        stages = chain.len(),
        "Access chain configured"
    );

    let router = Router::new()
        .route("/", get(handlers::home))
        .route("/home", get(handlers::home))
        .route("/whoami", get(handlers::whoami))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .fallback(handlers::not_found)
        // Applied bottom to top: the chain wraps every route and the fallback
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_chain_error))
                .layer(chain),
        )
        .layer(IdentityHeaderLayer::new(identity_header))
        .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
            info_span!(
                "http_request",
                method = %req.method(),
                uri = %req.uri(),
                request_id = tracing::field::Empty,
            )
        }));

    Ok(router.with_state(state))
}

/// The chain has already audited the fault; only the response is left.
async fn handle_chain_error(err: BoxError) -> Response {
    AppError::Upstream(err.to_string()).into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;
    use crate::clock::FixedClock;
    use crate::config::Config;
    use axum::http::StatusCode;
    use chrono::{Local, TimeZone};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app_at(hour: u32) -> (Router, Arc<MemoryAuditSink>) {
        let sink = Arc::new(MemoryAuditSink::new());
        let clock = Arc::new(FixedClock::new(
            Local.with_ymd_and_hms(2025, 1, 15, hour, 0, 0).unwrap(),
        ));
        let state = AppState::new(Config::default(), sink.clone(), clock).unwrap();
        (build_router(state).unwrap(), sink)
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_home_inside_window() {
        let (app, sink) = app_at(9);
        let req = Request::builder()
            .uri("/home")
            .header("x-authenticated-user", "alice")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].actor, "alice");
        assert_eq!(records[0].source_address, "unknown");
    }

    #[tokio::test]
    async fn test_home_outside_window() {
        let (app, sink) = app_at(20);
        let response = app.oneshot(get_req("/home")).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(sink.records()[0].status, 403);
    }

    #[tokio::test]
    async fn test_health_bypasses_restriction() {
        let (app, sink) = app_at(2);
        let response = app.oneshot(get_req("/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(sink.records()[0].path, "/health");
    }

    #[tokio::test]
    async fn test_unknown_route_is_audited() {
        let (app, sink) = app_at(10);
        let response = app.oneshot(get_req("/missing")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, 404);
    }

    #[tokio::test]
    async fn test_chain_error_becomes_json_500() {
        let response = handle_chain_error("boom".into()).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
