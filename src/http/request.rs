//! Inbound request representation.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) for every inbound request
//! - Extract routing-relevant information (host, path with query)
//! - Hold the buffered body so handlers and the forwarder can reuse it
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Host is normalised once (lowercase, port stripped) at construction
//! - Body is buffered up front; the dispatcher may offer the same request to
//!   several handlers

use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, Request as HttpRequest, Uri};
use bytes::Bytes;
use tower_http::request_id::{MakeRequestId, RequestId};

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates `x-request-id` values as UUID v4 strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &HttpRequest<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// A fully buffered inbound request, as seen by handlers.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Normalised host (lowercase, without port). Empty when the client sent none.
    pub host: String,
    /// Path plus query string, e.g. `/g/ruby?x=1`.
    pub uri: Uri,
    /// Request headers, forwarded unchanged by proxy handlers.
    pub headers: HeaderMap,
    /// Request body.
    pub body: Bytes,
}

impl Request {
    /// Create a request for `host` and `path` (which may carry a query string).
    ///
    /// An unparsable path degrades to `/`.
    pub fn new(method: Method, host: &str, path: &str) -> Self {
        Self {
            method,
            host: normalize_host(host),
            uri: path.parse().unwrap_or_else(|_| Uri::from_static("/")),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Shorthand for a GET request.
    pub fn get(host: &str, path: &str) -> Self {
        Self::new(Method::GET, host, path)
    }

    /// Add a header. Invalid names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Replace the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Path including the query string.
    pub fn path(&self) -> &str {
        self.uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
    }

    /// Retrieves a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The correlation ID assigned by the request-id layer, if any.
    pub fn request_id(&self) -> &str {
        self.header(X_REQUEST_ID).unwrap_or("unknown")
    }
}

/// Lowercase a host and strip any `:port` suffix.
///
/// Bracketed IPv6 literals keep their brackets: `[::1]:8080` becomes `[::1]`.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let without_port = if host.starts_with('[') {
        match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        }
    } else {
        match host.rsplit_once(':') {
            Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
            _ => host,
        }
    };
    without_port.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_is_normalised() {
        assert_eq!(normalize_host("Sync.LAN:8080"), "sync.lan");
        assert_eq!(normalize_host("sync.lan"), "sync.lan");
        assert_eq!(normalize_host("[::1]:8080"), "[::1]");
        assert_eq!(normalize_host(""), "");
    }

    #[test]
    fn path_keeps_query() {
        let req = Request::get("example.lan", "/search?q=rust");
        assert_eq!(req.path(), "/search?q=rust");
        assert_eq!(req.host, "example.lan");
    }

    #[test]
    fn bad_path_falls_back_to_root() {
        let req = Request::get("example.lan", "not a path");
        assert_eq!(req.path(), "/");
    }

    #[test]
    fn headers_are_case_insensitive() {
        let req = Request::get("a", "/").with_header("X-Token", "abc");
        assert_eq!(req.header("x-token"), Some("abc"));
        assert_eq!(req.request_id(), "unknown");
    }
}
