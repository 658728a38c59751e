//! HTTP handlers.

pub mod auth;
pub mod blog;
pub mod dashboard;
pub mod media;
pub mod profile;
pub mod public;
pub mod settings;
pub mod users;

/// Treat empty or whitespace-only form fields as absent.
pub(crate) fn none_if_empty(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Whether the client asked for a JSON response (AJAX uploads and the
/// media API share routes with the form flows).
pub(crate) fn wants_json(headers: &axum::http::HeaderMap) -> bool {
    let accepts_json = headers
        .get(axum::http::header::ACCEPT)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|accept| accept.contains("json"));
    let xhr = headers
        .get("x-requested-with")
        .and_then(|h| h.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("xmlhttprequest"));
    accepts_json || xhr
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderMap, HeaderValue};

    #[test]
    fn empty_fields_become_none() {
        assert_eq!(none_if_empty(None), None);
        assert_eq!(none_if_empty(Some("".into())), None);
        assert_eq!(none_if_empty(Some("  ".into())), None);
        assert_eq!(none_if_empty(Some(" x ".into())), Some("x".into()));
    }

    #[test]
    fn json_detection() {
        let mut headers = HeaderMap::new();
        assert!(!wants_json(&headers));

        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        assert!(wants_json(&headers));

        let mut xhr = HeaderMap::new();
        xhr.insert("x-requested-with", HeaderValue::from_static("XMLHttpRequest"));
        assert!(wants_json(&xhr));
    }
}
