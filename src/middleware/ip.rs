//! Client address resolution.
//!
//! # Priority
//!
//! 1. `X-Forwarded-For`, first non-empty entry
//! 2. `X-Real-IP`
//! 3. The direct peer address (`ConnectInfo<SocketAddr>` request extension)
//! 4. [`UNKNOWN_ADDRESS`]
//!
//! # Security Warning: Address Spoofing
//!
//! **The forwarded headers are client-controlled.** Unless this service only
//! receives traffic through a reverse proxy that overwrites them, the audit
//! trail records whatever address the client claims:
//!
//! ```nginx
//! proxy_set_header X-Real-IP $remote_addr;
//! proxy_set_header X-Forwarded-For $remote_addr;
//! ```
//!
//! # Internal Architecture
//!
//! ```text
//!   ┌──────────────────────────┐
//!   │ extract_source_address   │ ← Private, returns SourceAddress<'a>
//!   │ (no allocations)         │
//!   └───────────┬──────────────┘
//!               │
//!               ▼
//!   ┌──────────────────────────┐
//!   │ resolve_source_address   │ ← Public, returns Cow<'static, str>
//!   └──────────────────────────┘
//! ```

use std::borrow::Cow;
use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::Request;
use tracing::trace;

/// Fallback when no client address can be determined.
pub const UNKNOWN_ADDRESS: &str = "unknown";

/// Where a resolved address came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceAddress<'a> {
    /// First entry of X-Forwarded-For.
    Forwarded(&'a str),
    /// X-Real-IP header.
    RealIp(&'a str),
    /// Direct TCP peer.
    Peer(SocketAddr),
    NotFound,
}

#[inline]
fn extract_source_address<B>(req: &Request<B>) -> SourceAddress<'_> {
    // Format: "client, proxy1, proxy2" - the client is first
    if let Some(forwarded) = req.headers().get("x-forwarded-for")
        && let Ok(value) = forwarded.to_str()
        && let Some(first) = value.split(',').next().map(str::trim)
        && !first.is_empty()
    {
        return SourceAddress::Forwarded(first);
    }

    if let Some(real_ip) = req.headers().get("x-real-ip")
        && let Ok(value) = real_ip.to_str()
        && !value.trim().is_empty()
    {
        return SourceAddress::RealIp(value.trim());
    }

    if let Some(ConnectInfo(peer)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return SourceAddress::Peer(*peer);
    }

    SourceAddress::NotFound
}

/// Resolve the best-effort client address of `req`.
///
/// Never fails and never returns an empty string: every miss degrades to the
/// next source and finally to [`UNKNOWN_ADDRESS`] (borrowed, no allocation).
/// For a peer address only the IP is kept, not the port.
#[inline]
pub fn resolve_source_address<B>(req: &Request<B>) -> Cow<'static, str> {
    match extract_source_address(req) {
        SourceAddress::Forwarded(ip) | SourceAddress::RealIp(ip) => Cow::Owned(ip.to_string()),
        SourceAddress::Peer(peer) => Cow::Owned(peer.ip().to_string()),
        SourceAddress::NotFound => {
            trace!("No forwarded headers or peer address on request");
            Cow::Borrowed(UNKNOWN_ADDRESS)
        }
    }
}
