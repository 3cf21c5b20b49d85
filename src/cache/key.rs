//! Cache key construction.

use axum::http::{HeaderMap, Method};

/// Build the cache key for a request.
///
/// The key is `METHOD:path?query` plus one `|header=value` segment per
/// configured vary header, in configuration order. A vary header absent
/// from the request contributes an empty value, so present-vs-absent
/// always produces distinct keys.
pub fn build(
    method: &Method,
    path: &str,
    query: Option<&str>,
    headers: &HeaderMap,
    vary_by: &[String],
) -> String {
    let mut key = match query {
        Some(q) if !q.is_empty() => format!("{}:{}?{}", method, path, q),
        _ => format!("{}:{}", method, path),
    };

    for name in vary_by {
        let value = headers
            .get(name.as_str())
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        key.push('|');
        key.push_str(name);
        key.push('=');
        key.push_str(value);
    }

    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn query_string_distinguishes_keys() {
        let headers = HeaderMap::new();
        let with = build(&Method::GET, "/api/orders", Some("page=2"), &headers, &[]);
        let without = build(&Method::GET, "/api/orders", None, &headers, &[]);
        assert_ne!(with, without);
        assert_eq!(with, "GET:/api/orders?page=2");
    }

    #[test]
    fn vary_headers_distinguish_keys() {
        let vary = vec!["accept-language".to_string()];

        let mut en = HeaderMap::new();
        en.insert("accept-language", HeaderValue::from_static("en"));
        let mut de = HeaderMap::new();
        de.insert("accept-language", HeaderValue::from_static("de"));

        let key_en = build(&Method::GET, "/api/orders", None, &en, &vary);
        let key_de = build(&Method::GET, "/api/orders", None, &de, &vary);
        let key_absent = build(&Method::GET, "/api/orders", None, &HeaderMap::new(), &vary);

        assert_ne!(key_en, key_de);
        assert_ne!(key_en, key_absent);
        assert_eq!(key_absent, "GET:/api/orders|accept-language=");
    }

    #[test]
    fn unlisted_headers_do_not_affect_the_key() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("abc"));
        let a = build(&Method::GET, "/api/orders", None, &headers, &[]);
        let b = build(&Method::GET, "/api/orders", None, &HeaderMap::new(), &[]);
        assert_eq!(a, b);
    }
}
