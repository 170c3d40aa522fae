//! Outbound response values.
//!
//! # Responsibilities
//! - Construct the standard response shapes handlers return (redirect, text,
//!   HTML, JSON, not-found, error, bad-gateway)
//! - Carry upstream responses verbatim for proxy handlers
//! - Convert into an Axum response at the server boundary
//!
//! # Design Decisions
//! - Every constructor is total and performs no I/O
//! - Bodies are fully buffered `Bytes`

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use bytes::Bytes;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const TEXT_HTML: &str = "text/html; charset=utf-8";
const APPLICATION_JSON: &str = "application/json";

/// A complete HTTP response produced by a handler or the dispatcher.
#[derive(Debug, Clone)]
pub struct Response {
    /// Status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
}

impl Response {
    /// Assemble a response from its parts without touching any header.
    pub fn from_parts(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self { status, headers, body }
    }

    fn with_content_type(status: StatusCode, content_type: &'static str, body: Bytes) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        Self { status, headers, body }
    }

    /// 302 Found pointing at `location`, with an empty body.
    ///
    /// A location that is not a valid header value is percent-encoded byte by
    /// byte so the constructor never fails.
    pub fn redirect(location: &str) -> Self {
        let value = HeaderValue::from_str(location)
            .unwrap_or_else(|_| encode_header_value(location));
        let mut headers = HeaderMap::new();
        headers.insert(header::LOCATION, value);
        Self {
            status: StatusCode::FOUND,
            headers,
            body: Bytes::new(),
        }
    }

    /// 200 OK HTML page.
    pub fn html(body: impl Into<String>) -> Self {
        Self::html_with_status(StatusCode::OK, body)
    }

    /// HTML page with an explicit status.
    pub fn html_with_status(status: StatusCode, body: impl Into<String>) -> Self {
        Self::with_content_type(status, TEXT_HTML, Bytes::from(body.into()))
    }

    /// 200 OK plain text.
    pub fn text(body: impl Into<String>) -> Self {
        Self::with_content_type(StatusCode::OK, TEXT_PLAIN, Bytes::from(body.into()))
    }

    /// 200 OK JSON document.
    pub fn json(value: &serde_json::Value) -> Self {
        Self::with_content_type(
            StatusCode::OK,
            APPLICATION_JSON,
            Bytes::from(value.to_string()),
        )
    }

    /// 404 with the plain-text body `Not Found`.
    pub fn not_found() -> Self {
        Self::error(StatusCode::NOT_FOUND, "Not Found")
    }

    /// Plain-text error with a caller-supplied status and message.
    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self::with_content_type(status, TEXT_PLAIN, Bytes::from(message.into()))
    }

    /// 502 returned when an upstream cannot be reached.
    pub fn bad_gateway() -> Self {
        Self::error(StatusCode::BAD_GATEWAY, "Bad Gateway")
    }

    /// Value of a header as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl IntoResponse for Response {
    fn into_response(self) -> axum::response::Response {
        let mut response = axum::response::Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

fn encode_header_value(raw: &str) -> HeaderValue {
    let mut encoded = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_graphic() {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    HeaderValue::from_str(&encoded).unwrap_or_else(|_| HeaderValue::from_static("/"))
}
