//! Time-window admission middleware.
//!
//! # Behaviour
//!
//! On entry, asks the [`AccessPolicy`] about the instant the request entered
//! the chain:
//!
//! - **Deny**: returns `403 Forbidden` with a plain-text body immediately.
//!   The next stage and the handler are never called. The denial is the
//!   request's audit record.
//! - **Allow** (or bypassed path): calls the next stage, then records the
//!   real status on the way back out.
//!
//! Combined with [`RequestLoggingLayer`](super::RequestLoggingLayer) in any
//! order, each request still yields exactly one record: both stages share the
//! request's [`AuditSlot`].
//!
//! # Response
//!
//! ```text
//! HTTP/1.1 403 Forbidden
//! Content-Type: text/plain; charset=utf-8
//!
//! Access restricted: requests are only accepted between 08:00 and 18:00.
//! ```

use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use tower::{Layer, Service};
use tracing::{debug, warn};

use super::recorder::{AuditGuard, AuditSlot, run_audited};
use crate::audit::SharedAuditSink;
use crate::clock::{SharedClock, SystemClock};
use crate::context::RequestContext;
use crate::metrics;
use crate::policy::{AccessPolicy, AllowedWindow, Decision};

/// Layer rejecting requests outside the allowed window.
#[derive(Clone)]
pub struct TimeRestrictionLayer {
    policy: Arc<AccessPolicy>,
    sink: SharedAuditSink,
    clock: SharedClock,
}

impl TimeRestrictionLayer {
    pub fn new(policy: AccessPolicy, sink: SharedAuditSink) -> Self {
        Self {
            policy: Arc::new(policy),
            sink,
            clock: Arc::new(SystemClock),
        }
    }

    /// Clock used when no [`RequestContext`] has been captured upstream.
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }
}

impl<S> Layer<S> for TimeRestrictionLayer {
    type Service = TimeRestrictionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TimeRestrictionService {
            inner,
            policy: self.policy.clone(),
            sink: self.sink.clone(),
            clock: self.clock.clone(),
        }
    }
}

/// Time restriction service wrapper.
#[derive(Clone)]
pub struct TimeRestrictionService<S> {
    inner: S,
    policy: Arc<AccessPolicy>,
    sink: SharedAuditSink,
    clock: SharedClock,
}

impl<S> Service<Request<Body>> for TimeRestrictionService<S>
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

        let decision = if self.policy.is_bypassed(ctx.path()) {
            debug!(path = %ctx.path(), "Bypassing time restriction");
            Decision::Allow
        } else {
            self.policy.decide(&ctx.received_at())
        };

        match decision {
            Decision::Deny(reason) => {
                warn!(
                    request_id = %ctx.request_id(),
                    actor = %ctx.actor(),
                    path = %ctx.path(),
                    client_ip = %ctx.source_address(),
                    received_at = %ctx.received_at(),
                    window = %self.policy.window(),
                    %reason,
                    "Request rejected"
                );
                metrics::record_access_denied();

                let response = restricted_response(self.policy.window());
                AuditGuard::new(ctx, slot, self.sink.clone())
                    .finish(response.status().as_u16(), None);
                Box::pin(std::future::ready(Ok(response)))
            }
            Decision::Allow => {
                let guard = AuditGuard::new(ctx, slot, self.sink.clone());
                let clone = self.inner.clone();
                let inner = std::mem::replace(&mut self.inner, clone);
                Box::pin(run_audited(inner, req, guard))
            }
        }
    }
}

/// Build the 403 returned outside the allowed window.
pub fn restricted_response(window: &AllowedWindow) -> Response<Body> {
    let body = format!(
        "Access restricted: requests are only accepted between {:02}:00 and {:02}:00.",
        window.start_hour(),
        window.end_hour()
    );
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = StatusCode::FORBIDDEN;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
