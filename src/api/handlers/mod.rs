//! API handlers and shared request utilities.

pub mod health;
pub mod rate_limit;
pub mod root;
pub mod signup;
pub mod social;

use axum::http::HeaderMap;

/// Extract a client IP for rate limiting from common proxy headers.
pub(crate) fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if forwarded.is_some() {
        return forwarded.map(str::to_string);
    }
    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Caller-preferred locale: explicit body value first, else the
/// `Accept-Language` header. Clamping to length happens downstream.
pub(crate) fn requested_locale(body_locale: Option<String>, headers: &HeaderMap) -> Option<String> {
    body_locale
        .filter(|value| !value.trim().is_empty())
        .or_else(|| {
            headers
                .get("accept-language")
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        })
}
