//! Per-request snapshot shared by every stage of the chain.
//!
//! A [`RequestContext`] is captured once, at chain entry, and stored in the
//! request extensions. Stages read it instead of re-deriving fields so that
//! the access decision and the audit record agree on the same instant,
//! actor and address.

use axum::http::{Method, Request};
use chrono::{DateTime, Local};
use uuid::Uuid;

use crate::clock::Clock;
use crate::middleware::ip::{UNKNOWN_ADDRESS, resolve_source_address};
use crate::validation::normalize_path;

/// Actor label recorded when no identity has been resolved.
pub const ANONYMOUS: &str = "Anonymous";

/// Header carrying a caller-supplied correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Identity resolved by an authentication layer running before the chain.
///
/// The chain never authenticates; it only reads this extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity(pub String);

/// Immutable snapshot of the fields the pipeline cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    method: Method,
    path: String,
    actor: String,
    source_address: String,
    received_at: DateTime<Local>,
    request_id: String,
}

impl RequestContext {
    /// Build a context from already-resolved parts.
    ///
    /// Blank `actor` degrades to [`ANONYMOUS`], blank `source_address` to
    /// `"unknown"`, and `path` is normalised.
    pub fn new(
        method: Method,
        path: &str,
        actor: impl Into<String>,
        source_address: impl Into<String>,
        received_at: DateTime<Local>,
    ) -> Self {
        Self {
            method,
            path: normalize_path(path),
            actor: non_blank_or(actor.into(), ANONYMOUS),
            source_address: non_blank_or(source_address.into(), UNKNOWN_ADDRESS),
            received_at,
            request_id: Uuid::new_v4().to_string(),
        }
    }

    /// Capture a context from an inbound request.
    ///
    /// Field resolution never fails; missing data falls back to defaults.
    pub fn capture<B>(req: &Request<B>, received_at: DateTime<Local>) -> Self {
        let mut ctx = Self::new(
            req.method().clone(),
            req.uri().path(),
            resolve_actor(req),
            resolve_source_address(req).into_owned(),
            received_at,
        );
        if let Some(id) = incoming_request_id(req) {
            ctx.request_id = id;
        }
        ctx
    }

    /// Return the context already attached to `req`, capturing and attaching
    /// one stamped with `clock` if there is none.
    pub fn ensure<B>(req: &mut Request<B>, clock: &dyn Clock) -> Self {
        if let Some(ctx) = req.extensions().get::<RequestContext>() {
            return ctx.clone();
        }
        let ctx = Self::capture(req, clock.now());
        req.extensions_mut().insert(ctx.clone());
        ctx
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    pub fn source_address(&self) -> &str {
        &self.source_address
    }

    pub fn received_at(&self) -> DateTime<Local> {
        self.received_at
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }
}

/// Actor label for `req`: the [`Identity`] extension or [`ANONYMOUS`].
pub fn resolve_actor<B>(req: &Request<B>) -> String {
    req.extensions()
        .get::<Identity>()
        .map(|identity| identity.0.trim())
        .filter(|name| !name.is_empty())
        .unwrap_or(ANONYMOUS)
        .to_string()
}

fn incoming_request_id<B>(req: &Request<B>) -> Option<String> {
    req.headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn non_blank_or(value: String, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value
    }
}
