//! The audit record and its on-disk line formats.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, SecondsFormat};
use serde::Serialize;

use crate::context::RequestContext;
use crate::error::AuditResult;
use crate::validation::sanitize_field;

/// Status recorded when the caller went away before the handler finished.
///
/// Non-standard, borrowed from nginx ("client closed request").
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

/// One completed, rejected, failed or cancelled request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Local>,
    pub actor: String,
    pub method: String,
    pub path: String,
    pub status: u16,
    pub source_address: String,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl AuditRecord {
    /// Build the record for `ctx`, stamped with the context's entry time.
    pub fn from_context(ctx: &RequestContext, status: u16, error_detail: Option<String>) -> Self {
        Self {
            timestamp: ctx.received_at(),
            actor: ctx.actor().to_string(),
            method: ctx.method().as_str().to_string(),
            path: ctx.path().to_string(),
            status,
            source_address: ctx.source_address().to_string(),
            request_id: ctx.request_id().to_string(),
            error_detail,
        }
    }

    /// Render as a single line (without the trailing newline).
    pub fn to_line(&self, format: AuditFormat) -> AuditResult<String> {
        match format {
            AuditFormat::Text => Ok(self.to_string()),
            AuditFormat::Json => Ok(serde_json::to_string(&self.sanitized())?),
        }
    }

    fn sanitized(&self) -> Self {
        Self {
            timestamp: self.timestamp,
            actor: sanitize_field(&self.actor).into_owned(),
            method: sanitize_field(&self.method).into_owned(),
            path: sanitize_field(&self.path).into_owned(),
            status: self.status,
            source_address: sanitize_field(&self.source_address).into_owned(),
            request_id: sanitize_field(&self.request_id).into_owned(),
            error_detail: self
                .error_detail
                .as_deref()
                .map(|d| sanitize_field(d).into_owned()),
        }
    }
}

/// `<timestamp> - User: <actor> - <METHOD> <path> - Status: <code> - IP: <addr>`
/// followed by ` - Error: <detail>` when a fault was recorded.
impl fmt::Display for AuditRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - User: {} - {} {} - Status: {} - IP: {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, false),
            sanitize_field(&self.actor),
            sanitize_field(&self.method),
            sanitize_field(&self.path),
            self.status,
            sanitize_field(&self.source_address),
        )?;
        if let Some(detail) = &self.error_detail {
            write!(f, " - Error: {}", sanitize_field(detail))?;
        }
        Ok(())
    }
}

/// Line format of the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuditFormat {
    /// Human-readable line, see the [`AuditRecord`] `Display` impl.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl FromStr for AuditFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown audit format '{other}' (expected text or json)")),
        }
    }
}

impl fmt::Display for AuditFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditFormat::Text => f.write_str("text"),
            AuditFormat::Json => f.write_str("json"),
        }
    }
}
