//! Trusted identity header.
//!
//! The chain never authenticates anyone. In deployment an authenticating
//! proxy in front of this service sets a header with the caller's name; this
//! layer copies it into the [`Identity`] extension that the chain reads.
//! Only deploy with the header enabled behind a proxy that strips it from
//! client traffic.

use std::task::{Context, Poll};

use axum::http::{HeaderName, Request};
use tower::{Layer, Service};

use crate::context::Identity;

/// Default header carrying the authenticated user.
pub const DEFAULT_IDENTITY_HEADER: &str = "x-authenticated-user";

/// Layer turning a trusted header into an [`Identity`].
///
/// With `None`, requests pass through untouched and every caller is
/// anonymous unless something else sets the extension.
#[derive(Clone, Debug)]
pub struct IdentityHeaderLayer {
    header: Option<HeaderName>,
}

impl IdentityHeaderLayer {
    pub fn new(header: Option<HeaderName>) -> Self {
        Self { header }
    }
}

impl<S> Layer<S> for IdentityHeaderLayer {
    type Service = IdentityHeaderService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        IdentityHeaderService {
            inner,
            header: self.header.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct IdentityHeaderService<S> {
    inner: S,
    header: Option<HeaderName>,
}

impl<S, B> Service<Request<B>> for IdentityHeaderService<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        if let Some(name) = &self.header {
            let user = req
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string);
            if let Some(user) = user {
                req.extensions_mut().insert(Identity(user));
            }
        }
        self.inner.call(req)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use std::convert::Infallible;
    use tower::{ServiceExt, service_fn};

    fn default_header() -> HeaderName {
        HeaderName::from_static(DEFAULT_IDENTITY_HEADER)
    }

    async fn identity_for(layer: IdentityHeaderLayer, header: Option<&str>) -> Option<Identity> {
        let svc = layer.layer(service_fn(|req: Request<Body>| async move {
            Ok::<_, Infallible>(req.extensions().get::<Identity>().cloned())
        }));
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(DEFAULT_IDENTITY_HEADER, value);
        }
        svc.oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_header_sets_identity() {
        let layer = IdentityHeaderLayer::new(Some(default_header()));
        assert_eq!(
            identity_for(layer, Some(" alice ")).await,
            Some(Identity("alice".to_string()))
        );
    }

    #[tokio::test]
    async fn test_blank_header_is_ignored() {
        let layer = IdentityHeaderLayer::new(Some(default_header()));
        assert_eq!(identity_for(layer, Some("  ")).await, None);
    }

    #[tokio::test]
    async fn test_disabled_layer_ignores_header() {
        let layer = IdentityHeaderLayer::new(None);
        assert_eq!(identity_for(layer, Some("mallory")).await, None);
    }
}
