//! Exactly-once audit emission shared by every auditing stage.
//!
//! # Invariant
//!
//! Every request that enters the chain produces exactly one audit record,
//! whether it is allowed, denied, fails, panics, or is cancelled.
//!
//! # How
//!
//! - **At most once**: every auditing stage shares one [`AuditSlot`] stored
//!   in the request extensions. Writing a record first claims the slot; a
//!   stage that finds it already claimed stays silent.
//! - **At least once**: each auditing stage holds an [`AuditGuard`] across
//!   its call to the next stage. The guard is resolved with the real status
//!   on success, with `500` and the error text on an `Err`, with `500` and the
//!   panic message on a panic, and, if the future is dropped before any of
//!   those, with `499` from its `Drop` impl.
//!
//! ```text
//!  outer stage ──guard──▶ inner stage ──guard──▶ handler
//!       ▲                      │
//!       └──── slot claimed ◀───┘  (inner finishes first, outer skips)
//! ```
//!
//! Errors and panics are handed back to the caller unchanged after the
//! record is written.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use futures_util::FutureExt;
use tower::Service;
use tracing::{debug, error, warn};

use crate::audit::{AuditRecord, AuditSink, CLIENT_CLOSED_REQUEST, SharedAuditSink};
use crate::context::RequestContext;
use crate::metrics;

/// Status recorded for a request whose handler returned an error or panicked.
pub const FAULT_STATUS: StatusCode = StatusCode::INTERNAL_SERVER_ERROR;

/// Error detail recorded for a cancelled request.
pub const CANCELLED_DETAIL: &str = "request cancelled before completion";

/// Per-request claim flag ensuring a single audit record.
#[derive(Debug, Default)]
pub struct AuditSlot {
    claimed: AtomicBool,
}

impl AuditSlot {
    /// Claim the right to write this request's record. Only the first call
    /// returns `true`.
    pub fn claim(&self) -> bool {
        !self.claimed.swap(true, Ordering::AcqRel)
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }

    /// The slot attached to `req`, attaching a fresh one if needed.
    pub fn ensure<B>(req: &mut Request<B>) -> Arc<AuditSlot> {
        if let Some(slot) = req.extensions().get::<Arc<AuditSlot>>() {
            return slot.clone();
        }
        let slot = Arc::new(AuditSlot::default());
        req.extensions_mut().insert(slot.clone());
        slot
    }
}

/// Append `record`, reporting failures on the operational log.
///
/// A failing sink never fails the request.
pub(crate) fn write_record(sink: &dyn AuditSink, record: &AuditRecord) {
    match sink.append(record) {
        Ok(()) => {
            metrics::record_audit_written(record.status);
            debug!(
                request_id = %record.request_id,
                status = record.status,
                "Audit record written"
            );
        }
        Err(e) => {
            metrics::record_sink_failure();
            error!(
                target: "audit",
                error = %e,
                request_id = %record.request_id,
                actor = %record.actor,
                method = %record.method,
                path = %record.path,
                status = record.status,
                "Failed to write audit record; audit trail has a gap"
            );
        }
    }
}

struct Pending {
    ctx: RequestContext,
    slot: Arc<AuditSlot>,
    sink: SharedAuditSink,
}

impl Pending {
    fn emit(self, status: u16, error_detail: Option<String>) -> bool {
        if !self.slot.claim() {
            return false;
        }
        let record = AuditRecord::from_context(&self.ctx, status, error_detail);
        write_record(self.sink.as_ref(), &record);
        true
    }
}

/// Holds a request's pending audit record until the request resolves.
pub(crate) struct AuditGuard {
    pending: Option<Pending>,
    started: Instant,
}

impl AuditGuard {
    pub(crate) fn new(ctx: RequestContext, slot: Arc<AuditSlot>, sink: SharedAuditSink) -> Self {
        Self {
            pending: Some(Pending { ctx, slot, sink }),
            started: Instant::now(),
        }
    }

    /// Resolve with the final status. No-op if another stage already wrote.
    pub(crate) fn finish(mut self, status: u16, error_detail: Option<String>) {
        if let Some(pending) = self.pending.take() {
            let method = pending.ctx.method().as_str().to_string();
            if pending.emit(status, error_detail) {
                metrics::record_request_duration(
                    &method,
                    status,
                    self.started.elapsed().as_secs_f64(),
                );
            }
        }
    }
}

impl Drop for AuditGuard {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            if pending.slot.is_claimed() {
                return;
            }
            warn!(
                request_id = %pending.ctx.request_id(),
                path = %pending.ctx.path(),
                "Request dropped before completion"
            );
            pending.emit(CLIENT_CLOSED_REQUEST, Some(CANCELLED_DETAIL.to_string()));
        }
    }
}

/// Call `inner` and resolve `guard` from whatever comes back.
pub(crate) async fn run_audited<S>(
    mut inner: S,
    req: Request<Body>,
    guard: AuditGuard,
) -> Result<Response<Body>, S::Error>
where
    S: Service<Request<Body>, Response = Response<Body>>,
    S::Error: fmt::Display,
{
    // `call` itself may panic before returning a future
    match AssertUnwindSafe(async move { inner.call(req).await })
        .catch_unwind()
        .await
    {
        Ok(Ok(response)) => {
            guard.finish(response.status().as_u16(), None);
            Ok(response)
        }
        Ok(Err(err)) => {
            guard.finish(FAULT_STATUS.as_u16(), Some(err.to_string()));
            Err(err)
        }
        Err(payload) => {
            guard.finish(
                FAULT_STATUS.as_u16(),
                Some(format!("handler panicked: {}", panic_message(payload.as_ref()))),
            );
            panic::resume_unwind(payload)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;
    use axum::http::Method;
    use chrono::{Local, TimeZone};

    fn ctx() -> RequestContext {
        RequestContext::new(
            Method::GET,
            "/home",
            "alice",
            "10.0.0.1",
            Local.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_slot_claims_once() {
        let slot = AuditSlot::default();
        assert!(slot.claim());
        assert!(!slot.claim());
        assert!(slot.is_claimed());
    }

    #[test]
    fn test_slot_ensure_reuses_existing() {
        let mut req = Request::builder().body(Body::empty()).unwrap();
        let first = AuditSlot::ensure(&mut req);
        let second = AuditSlot::ensure(&mut req);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_guard_finish_writes_once() {
        let sink = Arc::new(MemoryAuditSink::new());
        let slot = Arc::new(AuditSlot::default());

        let outer = AuditGuard::new(ctx(), slot.clone(), sink.clone());
        let inner = AuditGuard::new(ctx(), slot, sink.clone());
        inner.finish(201, None);
        outer.finish(200, None);

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, 201);
    }

    #[test]
    fn test_dropped_guard_records_cancellation() {
        let sink = Arc::new(MemoryAuditSink::new());
        drop(AuditGuard::new(
            ctx(),
            Arc::new(AuditSlot::default()),
            sink.clone(),
        ));

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, CLIENT_CLOSED_REQUEST);
        assert_eq!(records[0].error_detail.as_deref(), Some(CANCELLED_DETAIL));
    }

    #[test]
    fn test_dropped_guard_after_claim_is_silent() {
        let sink = Arc::new(MemoryAuditSink::new());
        let slot = Arc::new(AuditSlot::default());
        assert!(slot.claim());

        drop(AuditGuard::new(ctx(), slot, sink.clone()));

        assert!(sink.is_empty());
    }

    #[test]
    fn test_panic_message_variants() {
        let s: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(s.as_ref()), "static");
        let s: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(s.as_ref()), "owned");
        let s: Box<dyn Any + Send> = Box::new(7_u32);
        assert_eq!(panic_message(s.as_ref()), "non-string panic payload");
    }
}
