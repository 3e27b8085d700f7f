//! Shared utility functions.

use axum::http::HeaderMap;
use unicode_normalization::UnicodeNormalization;

/// Canonical form of a coupon code: trimmed, NFKC-normalized and upper-cased.
/// May be empty; callers decide whether that is an error.
pub fn normalize_code(raw: &str) -> String {
    raw.trim().nfkc().collect::<String>().to_uppercase()
}

/// Extract a Bearer token from the Authorization header.
///
/// Returns the token string without the "Bearer " prefix, or None if
/// the header is missing, malformed, or empty after the prefix.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}
