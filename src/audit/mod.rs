//! Durable, append-only audit trail.
//!
//! # Components
//!
//! - [`AuditRecord`]: one line per request that entered the chain
//! - [`AuditSink`]: where records go; must be safe to call concurrently and
//!   must write each record atomically (no interleaved partial lines)
//! - [`FileAuditSink`]: append-only file, created lazily on first write
//! - [`MemoryAuditSink`]: in-process buffer for tests
//!
//! Sinks are constructed explicitly and handed to the middleware that needs
//! them; there is no process-global audit logger.

mod file;
mod memory;
mod record;

use std::sync::Arc;

pub use file::FileAuditSink;
pub use memory::MemoryAuditSink;
pub use record::{AuditFormat, AuditRecord, CLIENT_CLOSED_REQUEST};

use crate::error::AuditResult;

/// Destination for audit records.
pub trait AuditSink: Send + Sync {
    /// Append one record. Implementations serialise concurrent callers.
    fn append(&self, record: &AuditRecord) -> AuditResult<()>;

    /// Number of records successfully appended since construction.
    fn records_written(&self) -> u64;
}

/// Shared, type-erased sink handle.
pub type SharedAuditSink = Arc<dyn AuditSink>;
