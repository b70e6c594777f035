//! Request audit logging middleware.
//!
//! Does nothing on the way in. Once the rest of the chain returns, fails,
//! panics or is cancelled, writes one [`AuditRecord`](crate::audit::AuditRecord)
//! with the final status. Never affects the access decision and never turns
//! an error into a response.
//!
//! # Usage
//!
//! ```rust,ignore
//! let sink: SharedAuditSink = Arc::new(FileAuditSink::new("logs/requests.log", AuditFormat::Text));
//! let app = ServiceBuilder::new()
//!     .layer(RequestLoggingLayer::new(sink))
//!     .service(handler);
//! ```

use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Request, Response};
use tower::{Layer, Service};

use super::recorder::{AuditGuard, AuditSlot, run_audited};
use crate::audit::SharedAuditSink;
use crate::clock::{SharedClock, SystemClock};
use crate::context::RequestContext;

/// Layer writing one audit record per request.
#[derive(Clone)]
pub struct RequestLoggingLayer {
    sink: SharedAuditSink,
    clock: SharedClock,
}

impl RequestLoggingLayer {
    pub fn new(sink: SharedAuditSink) -> Self {
        Self {
            sink,
            clock: Arc::new(SystemClock),
        }
    }

    /// Clock used only when no [`RequestContext`] has been captured upstream.
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }
}

impl<S> Layer<S> for RequestLoggingLayer {
    type Service = RequestLoggingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLoggingService {
            inner,
            sink: self.sink.clone(),
            clock: self.clock.clone(),
        }
    }
}

/// Request logging service wrapper.
#[derive(Clone)]
pub struct RequestLoggingService<S> {
    inner: S,
    sink: SharedAuditSink,
    clock: SharedClock,
}

impl<S> Service<Request<Body>> for RequestLoggingService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: fmt::Display + Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let ctx = RequestContext::ensure(&mut req, self.clock.as_ref());
        let slot = AuditSlot::ensure(&mut req);
        let guard = AuditGuard::new(ctx, slot, self.sink.clone());

        // The ready service handles this request; the clone waits for the next
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(run_audited(inner, req, guard))
    }
}
