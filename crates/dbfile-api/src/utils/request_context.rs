//! Request context: where the request came from and who sent it.

use axum::http::{header, HeaderMap};
use dbfile_core::RequestOrigin;

/// Attribution used when the identity header is missing or empty.
pub const ANONYMOUS_USER: &str = "anonymous";

/// Scheme and host the browser used to reach us.
///
/// The scheme comes from `X-Forwarded-Proto` when a proxy sets it; the host from
/// `X-Forwarded-Host`, then `Host`. Missing values keep the `http://localhost` defaults.
pub fn request_origin(headers: &HeaderMap) -> RequestOrigin {
    let defaults = RequestOrigin::default();

    let scheme = header_value(headers, "x-forwarded-proto")
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_lowercase())
        .filter(|v| v == "http" || v == "https")
        .unwrap_or(defaults.scheme);

    let host = header_value(headers, "x-forwarded-host")
        .or_else(|| header_value(headers, header::HOST.as_str()))
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or(defaults.host);

    RequestOrigin::new(scheme, host)
}

/// User to record as the last modifier of an attachment.
pub fn modified_by(headers: &HeaderMap, header_name: &str) -> String {
    header_value(headers, header_name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(ANONYMOUS_USER)
        .to_string()
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
