//! HTTP middleware for access restriction and request auditing.
//!
//! - **Request Context**: Stamps method, path, actor, address and arrival
//!   time once, at chain entry
//! - **Time Restriction**: Rejects requests outside the allowed hours with 403
//! - **Request Logging**: Writes one audit record per request
//! - **Identity Header**: Copies a trusted proxy header into the request identity
//! - **Source Address**: Forwarded-header aware client address resolution
//!
//! # Architecture
//!
//! ```text
//! Request → Identity → Context → Logging → Restriction → Handler → Response
//!                         ↓                     ↓
//!                  X-Request-Id          403 Forbidden (handler skipped)
//!
//!                 one audit record per request, written by the
//!                 innermost auditing stage to resolve
//! ```

pub mod context;
pub mod identity;
pub mod ip;
pub mod recorder;
pub mod request_logging;
pub mod time_restriction;

pub use context::RequestContextLayer;
pub use identity::{DEFAULT_IDENTITY_HEADER, IdentityHeaderLayer};
pub use ip::{UNKNOWN_ADDRESS, resolve_source_address};
pub use recorder::{AuditSlot, CANCELLED_DETAIL, FAULT_STATUS};
pub use request_logging::RequestLoggingLayer;
pub use time_restriction::{TimeRestrictionLayer, restricted_response};
