//! # Audit Gate
//!
//! HTTP middleware that restricts access to a daily time window and writes
//! one audit record per request, built on Axum and Tower:
//!
//! - **Time Restriction**: Requests outside the allowed hours get 403 and
//!   never reach the handler
//! - **Request Audit**: Exactly one line per request in an append-only log,
//!   whether the request succeeds, is denied, fails, panics or is cancelled
//! - **Observability**: Structured logs on stderr, Prometheus counters
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Trace → Identity Header → Error Handler                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Chain (Context → Request Logging → Time Restriction)       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Handlers (home, whoami, health, ready, fallback)           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  AuditSink (append-only file, one line per request)         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use audit_gate::{AppState, Config, build_router};
//! use audit_gate::audit::FileAuditSink;
//! use audit_gate::clock::SystemClock;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let sink = FileAuditSink::open(config.audit_log_path(), config.audit_log_format)?;
//!     let state = AppState::new(config, Arc::new(sink), Arc::new(SystemClock))?;
//!     let app = build_router(state)?;
//!
//!     // Start the server...
//!     Ok(())
//! }
//! ```
//!
//! ## Using the chain directly
//!
//! ```rust,ignore
//! let handler = Chain::standard(clock, sink, AccessPolicy::default())
//!     .service(service_fn(my_handler));
//! let response = handler.handle(request).await?;
//! ```

pub mod audit;
pub mod chain;
pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod policy;
pub mod routes;
pub mod state;
pub mod utils;
pub mod validation;

// Re-exports for convenience
pub use audit::{AuditFormat, AuditRecord, AuditSink, FileAuditSink, MemoryAuditSink};
pub use chain::{Chain, ChainHandler};
pub use config::Config;
pub use context::{Identity, RequestContext};
pub use error::{AppError, AppResult, AuditError};
pub use policy::{AccessPolicy, AllowedWindow, Decision};
pub use routes::build_router;
pub use state::AppState;
