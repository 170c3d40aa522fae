//! Transparent request forwarding.
//!
//! # Responsibilities
//! - Keep one pooled HTTP client per upstream base (`scheme://host:port`)
//! - Forward method, path, query, headers and body unchanged
//! - Relay the upstream response verbatim
//! - Map transport failures to 502 Bad Gateway
//!
//! # Design Decisions
//! - Clients are created lazily on first use of an upstream
//! - `clear()` drops every pooled client; requests already holding a clone
//!   finish on it, later requests build a fresh one
//! - Connect timeout is enforced by the connector; the overall deadline is the
//!   owning handler's timeout

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, Request as HttpRequest, Uri};
use bytes::Bytes;
use dashmap::DashMap;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use url::Url;

use crate::http::{Request, Response};

/// Headers that describe a single connection rather than the message.
const HOP_BY_HOP: [&str; 7] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Upper bound on a relayed upstream body.
const MAX_UPSTREAM_BODY: usize = 64 * 1024 * 1024;

type PooledClient = Client<HttpConnector, Body>;

/// Reasons a forward attempt failed.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("invalid upstream `{0}`")]
    InvalidUpstream(String),

    #[error("unsupported upstream scheme `{0}`")]
    UnsupportedScheme(String),

    #[error("failed to build upstream request: {0}")]
    Request(#[from] axum::http::Error),

    #[error("upstream unreachable: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    #[error("failed to read upstream body: {0}")]
    Body(#[from] axum::Error),
}

/// Forwards requests to upstreams through per-upstream pooled clients.
#[derive(Debug)]
pub struct Forwarder {
    pool: DashMap<String, PooledClient>,
    connect_timeout: Duration,
}

impl Forwarder {
    /// Create an empty forwarder.
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            pool: DashMap::new(),
            connect_timeout,
        }
    }

    /// Forward `request` to `target` (a full URL) and return the upstream's
    /// response, or 502 if the upstream cannot be reached.
    pub async fn forward(&self, target: &str, request: &Request) -> Response {
        match self.try_forward(target, request).await {
            Ok(response) => {
                tracing::debug!(
                    target = %target,
                    method = %request.method,
                    status = response.status.as_u16(),
                    "Forwarded request"
                );
                response
            }
            Err(e) => {
                tracing::warn!(
                    target = %target,
                    method = %request.method,
                    error = %e,
                    "Upstream error"
                );
                Response::bad_gateway()
            }
        }
    }

    async fn try_forward(&self, target: &str, request: &Request) -> Result<Response, ForwardError> {
        let (key, uri) = upstream_uri(target)?;
        let client = self.client_for(&key);

        let mut builder = HttpRequest::builder()
            .method(request.method.clone())
            .uri(uri);
        if let Some(headers) = builder.headers_mut() {
            headers.extend(request.headers.clone());
        }
        let outbound = builder.body(Body::from(request.body.clone()))?;

        let upstream: hyper::Response<hyper::body::Incoming> = client.request(outbound).await?;
        let (mut parts, body) = upstream.into_parts();
        let body: Bytes = axum::body::to_bytes(Body::new(body), MAX_UPSTREAM_BODY).await?;

        // The body is now buffered; its framing is re-derived on the way out.
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts.status, parts.headers, body))
    }

    /// The pooled client for `key`, created on first use.
    fn client_for(&self, key: &str) -> PooledClient {
        if let Some(client) = self.pool.get(key) {
            return client.clone();
        }
        self.pool
            .entry(key.to_string())
            .or_insert_with(|| {
                tracing::debug!(upstream = %key, "Creating pooled upstream client");
                let mut connector = HttpConnector::new();
                connector.set_connect_timeout(Some(self.connect_timeout));
                Client::builder(TokioExecutor::new()).build(connector)
            })
            .clone()
    }

    /// Drop every pooled client.
    pub fn clear(&self) {
        let dropped = self.pool.len();
        self.pool.clear();
        if dropped > 0 {
            tracing::debug!(clients = dropped, "Upstream pool cleared");
        }
    }

    /// Number of pooled upstream clients.
    pub fn pooled(&self) -> usize {
        self.pool.len()
    }
}

/// Normalise `target` into its pool key and request URI.
///
/// The key is `scheme://host:port` with the scheme's default port filled in,
/// so `http://nas.lan` and `http://NAS.lan:80/x` share one client.
pub fn upstream_uri(target: &str) -> Result<(String, Uri), ForwardError> {
    let url = Url::parse(target).map_err(|_| ForwardError::InvalidUpstream(target.to_string()))?;
    if url.scheme() != "http" {
        return Err(ForwardError::UnsupportedScheme(url.scheme().to_string()));
    }
    let host = url
        .host_str()
        .ok_or_else(|| ForwardError::InvalidUpstream(target.to_string()))?;
    let port = url
        .port_or_known_default()
        .ok_or_else(|| ForwardError::InvalidUpstream(target.to_string()))?;
    let key = format!("{}://{}:{}", url.scheme(), host, port);
    let uri: Uri = url
        .as_str()
        .parse()
        .map_err(|_| ForwardError::InvalidUpstream(target.to_string()))?;
    Ok((key, uri))
}

/// Remove connection-scoped headers, including any named by `Connection`.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in named {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Join an upstream base URL and a request path (which keeps its query).
pub fn join_target(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}
