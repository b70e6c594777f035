//! Ordered middleware chain around a terminal handler.
//!
//! A [`Chain`] is a list of stages registered in order; the first registered
//! stage is the outermost, i.e. it sees the request first and the response
//! last. Every chain starts with a [`RequestContextLayer`] that stamps the
//! request once, so all stages agree on when it arrived.
//!
//! ```text
//!   Chain::new(clock)
//!       .layer(RequestLoggingLayer::new(sink.clone()))      // outer
//!       .layer(TimeRestrictionLayer::new(policy, sink))     // inner
//!       .service(handler)
//!
//!   request ─▶ context ─▶ logging ─▶ restriction ─▶ handler
//! ```
//!
//! The chain is type-erased at each stage so any number of stages can be
//! registered at runtime. Errors from the terminal are boxed into
//! [`BoxError`] and propagated unchanged; turning them into HTTP responses is
//! the job of whatever dispatches into the chain (see
//! [`routes`](crate::routes)).

use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Request, Response};
use tower::util::BoxCloneSyncService;
use tower::{Layer, Service, ServiceExt};

use crate::audit::SharedAuditSink;
use crate::clock::SharedClock;
use crate::middleware::{RequestContextLayer, RequestLoggingLayer, TimeRestrictionLayer};
use crate::policy::AccessPolicy;

pub use tower::BoxError;

/// A type-erased stage or terminal.
pub type ChainService = BoxCloneSyncService<Request<Body>, Response<Body>, BoxError>;

type Stage = Arc<dyn Fn(ChainService) -> ChainService + Send + Sync>;

/// Builder for an ordered middleware chain.
#[derive(Clone)]
pub struct Chain {
    clock: SharedClock,
    stages: Vec<Stage>,
}

impl Chain {
    /// An empty chain; `clock` stamps each request's arrival time.
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            stages: Vec::new(),
        }
    }

    /// Request logging outside time restriction.
    ///
    /// Denied requests are recorded by the restriction stage; everything else
    /// is recorded once the handler resolves.
    pub fn standard(clock: SharedClock, sink: SharedAuditSink, policy: AccessPolicy) -> Self {
        Self::new(clock.clone())
            .layer(RequestLoggingLayer::new(sink.clone()).with_clock(clock.clone()))
            .layer(TimeRestrictionLayer::new(policy, sink).with_clock(clock))
    }

    /// Append a stage inside every stage registered so far.
    pub fn layer<L>(mut self, layer: L) -> Self
    where
        L: Layer<ChainService> + Send + Sync + 'static,
        L::Service: Service<Request<Body>, Response = Response<Body>, Error = BoxError>
            + Clone
            + Send
            + Sync
            + 'static,
        <L::Service as Service<Request<Body>>>::Future: Send + 'static,
    {
        self.stages
            .push(Arc::new(move |inner| BoxCloneSyncService::new(layer.layer(inner))));
        self
    }

    /// Number of registered stages, not counting the context stage.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Wrap `terminal` with every stage.
    pub fn service<S>(&self, terminal: S) -> ChainHandler
    where
        S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + Sync + 'static,
        S::Error: Into<BoxError>,
        S::Future: Send + 'static,
    {
        let mut svc = BoxCloneSyncService::new(terminal.map_err(Into::<BoxError>::into));
        for stage in self.stages.iter().rev() {
            svc = stage(svc);
        }
        let svc = BoxCloneSyncService::new(RequestContextLayer::new(self.clock.clone()).layer(svc));
        ChainHandler { inner: svc }
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("stages", &self.stages.len())
            .finish_non_exhaustive()
    }
}

impl<S> Layer<S> for Chain
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + Sync + 'static,
    S::Error: Into<BoxError>,
    S::Future: Send + 'static,
{
    type Service = ChainHandler;

    fn layer(&self, inner: S) -> Self::Service {
        self.service(inner)
    }
}

/// A fully assembled chain, ready to handle requests.
#[derive(Clone)]
pub struct ChainHandler {
    inner: ChainService,
}

impl ChainHandler {
    /// Run one request through every stage and the terminal.
    pub async fn handle(&self, req: Request<Body>) -> Result<Response<Body>, BoxError> {
        self.inner.clone().oneshot(req).await
    }
}

impl Service<Request<Body>> for ChainHandler {
    type Response = Response<Body>;
    type Error = BoxError;
    type Future = <ChainService as Service<Request<Body>>>::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        self.inner.call(req)
    }
}
