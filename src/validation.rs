//! Input normalisation and validation helpers.
//!
//! Used by the configuration loader (header names, bypass paths) and by the
//! request context / audit record builders (paths, free-text fields).

use std::borrow::Cow;

use axum::http::HeaderName;

use crate::error::{AppError, AppResult};

// =============================================================================
// Validation Constants
// =============================================================================

/// Largest valid start hour of an allowed window.
pub const MAX_START_HOUR: u8 = 23;

/// Largest valid (exclusive) end hour of an allowed window.
///
/// `24` lets a window run up to midnight, e.g. `0..24` admits every hour.
pub const MAX_END_HOUR: u8 = 24;

/// Maximum length kept for a free-text audit field before truncation.
pub const MAX_FIELD_LENGTH: usize = 1024;

/// Normalise a request path.
///
/// Rules:
/// - An empty path becomes `/`
/// - A leading `/` is always present
/// - Runs of consecutive slashes collapse to one
///
/// Percent-encoding and dot segments are left alone; the path is recorded,
/// not routed.
pub fn normalize_path(raw: &str) -> String {
    let mut normalized = String::with_capacity(raw.len() + 1);
    normalized.push('/');

    let mut prev_slash = true;
    for c in raw.chars() {
        if c == '/' {
            if !prev_slash {
                normalized.push('/');
            }
            prev_slash = true;
        } else {
            normalized.push(c);
            prev_slash = false;
        }
    }

    normalized
}

/// Make a value safe to embed in a single audit line.
///
/// Control characters (including `\n` and `\r`) become spaces and overly long
/// values are truncated at a character boundary. Borrows when nothing changes.
pub fn sanitize_field(value: &str) -> Cow<'_, str> {
    let needs_cleaning = value.chars().any(char::is_control);
    let too_long = value.chars().count() > MAX_FIELD_LENGTH;

    if !needs_cleaning && !too_long {
        return Cow::Borrowed(value);
    }

    Cow::Owned(
        value
            .chars()
            .take(MAX_FIELD_LENGTH)
            .map(|c| if c.is_control() { ' ' } else { c })
            .collect(),
    )
}

/// Validate a path exempted from the time restriction.
///
/// Rules:
/// - Must start with `/`
/// - Must not contain whitespace or control characters
pub fn validate_bypass_path(path: &str) -> AppResult<()> {
    if !path.starts_with('/') {
        return Err(AppError::ConfigError(format!(
            "Bypass path '{path}' must start with '/'"
        )));
    }

    if let Some(pos) = path
        .chars()
        .position(|c| c.is_control() || c.is_whitespace())
    {
        return Err(AppError::ConfigError(format!(
            "Bypass path contains invalid character at position {pos}"
        )));
    }

    Ok(())
}

/// Parse a header name used to carry an upstream-resolved identity.
pub fn validate_header_name(name: &str) -> AppResult<HeaderName> {
    HeaderName::from_bytes(name.trim().as_bytes())
        .map_err(|e| AppError::ConfigError(format!("Invalid header name '{name}': {e}")))
}
