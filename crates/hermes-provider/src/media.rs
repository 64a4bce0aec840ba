//! Media type handling.
//!
//! The provider serves exactly one media type, `application/json`.
//! Parameters such as `charset` are ignored; wildcards and `+json` suffix
//! types are not accepted.

use http::header::{self, HeaderMap};
use mime::Mime;

/// The media type the provider reads and writes.
pub const APPLICATION_JSON: Mime = mime::APPLICATION_JSON;

/// Returns `true` if `media_type` is `application/json`, ignoring parameters.
///
/// # Example
///
/// ```rust
/// use hermes_provider::media::is_json;
///
/// assert!(is_json(&"application/json; charset=utf-8".parse().unwrap()));
/// assert!(!is_json(&"application/*".parse().unwrap()));
/// assert!(!is_json(&"application/problem+json".parse().unwrap()));
/// ```
#[must_use]
pub fn is_json(media_type: &Mime) -> bool {
    media_type
        .essence_str()
        .eq_ignore_ascii_case(APPLICATION_JSON.essence_str())
}

/// Parses a media type, returning `None` if it is not well formed.
#[must_use]
pub fn parse(value: &str) -> Option<Mime> {
    value.trim().parse().ok()
}

/// Returns the parsed `Content-Type` of a request, if present and valid.
#[must_use]
pub fn content_type(headers: &HeaderMap) -> Option<Mime> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(parse)
}
