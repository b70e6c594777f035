//! Chain entry stage: stamps the [`RequestContext`] once.
//!
//! Every chain built by [`Chain`](crate::chain::Chain) starts with this
//! layer, so the access decision and the audit record read the same
//! `received_at` regardless of how long earlier stages take.
//!
//! The request id is echoed back in the `X-Request-Id` response header.
//! Clients can supply their own:
//!
//! ```bash
//! curl -H "X-Request-Id: my-correlation-id" http://localhost:3000/home
//! ```

use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::header::HeaderValue;
use axum::http::{Request, Response};
use tower::{Layer, Service};
use tracing::{Span, debug};

use super::recorder::AuditSlot;
use crate::clock::SharedClock;
use crate::context::{REQUEST_ID_HEADER, RequestContext};

/// Layer capturing the per-request snapshot.
#[derive(Clone)]
pub struct RequestContextLayer {
    clock: SharedClock,
}

impl RequestContextLayer {
    pub fn new(clock: SharedClock) -> Self {
        Self { clock }
    }
}

impl<S> Layer<S> for RequestContextLayer {
    type Service = RequestContextService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestContextService {
            inner,
            clock: self.clock.clone(),
        }
    }
}

/// Request context service wrapper.
#[derive(Clone)]
pub struct RequestContextService<S> {
    inner: S,
    clock: SharedClock,
}

impl<S> Service<Request<Body>> for RequestContextService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
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
        AuditSlot::ensure(&mut req);

        Span::current().record("request_id", ctx.request_id());
        debug!(
            request_id = %ctx.request_id(),
            method = %ctx.method(),
            path = %ctx.path(),
            actor = %ctx.actor(),
            "Request entered chain"
        );

        let header = HeaderValue::from_str(ctx.request_id()).ok();
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let mut response = inner.call(req).await?;
            if let Some(value) = header {
                response.headers_mut().insert(REQUEST_ID_HEADER, value);
            }
            Ok(response)
        })
    }
}
