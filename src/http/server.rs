//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with a single fallback into the dispatcher
//! - Wire up middleware (request ID, tracing, timeout, panic recovery)
//! - Buffer the inbound body under the configured limit
//! - Bind server to listener and stop on the shutdown broadcast

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use std::error::Error as StdError;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request as HttpRequest, StatusCode},
    response::{IntoResponse, Response as AxumResponse},
    Router,
};
use http_body_util::LengthLimitError;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::RouterConfig;
use crate::http::request::{MakeRequestUuid, Request};
use crate::http::response::Response;
use crate::observability::metrics;
use crate::routing::Dispatcher;

/// Application state injected into the dispatch handler.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub max_body_bytes: usize,
}

/// HTTP front end for the dispatcher.
pub struct HttpServer {
    router: Router,
    dispatcher: Arc<Dispatcher>,
}

impl HttpServer {
    /// Create a new HTTP server serving `dispatcher`.
    pub fn new(config: &RouterConfig, dispatcher: Arc<Dispatcher>) -> Self {
        let state = AppState {
            dispatcher: dispatcher.clone(),
            max_body_bytes: config.listener.max_body_bytes,
        };
        let router = Self::build_router(config, state);
        Self { router, dispatcher }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &RouterConfig, state: AppState) -> Router {
        Router::new()
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(CatchPanicLayer::new())
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            handlers = self.dispatcher.handlers().len(),
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Buffers the request and hands it to the dispatcher.
async fn dispatch_handler(
    State(state): State<AppState>,
    request: HttpRequest<Body>,
) -> AxumResponse {
    let start = Instant::now();
    let (parts, body) = request.into_parts();

    let host = parts
        .headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| parts.uri.authority().map(|a| a.as_str()))
        .unwrap_or("");
    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    let mut request = Request::new(parts.method.clone(), host, path);
    request.headers = parts.headers;

    request.body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            let rejection = body_rejection(&e);
            tracing::warn!(
                request_id = %request.request_id(),
                limit = state.max_body_bytes,
                status = rejection.status.as_u16(),
                error = %e,
                "Request body rejected"
            );
            metrics::record_request(rejection.status.as_u16(), start);
            return rejection.into_response();
        }
    };

    let response = state.dispatcher.dispatch(&request).await;

    tracing::debug!(
        request_id = %request.request_id(),
        method = %request.method,
        host = %request.host,
        path = %request.path(),
        status = response.status.as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Request complete"
    );
    metrics::record_request(response.status.as_u16(), start);

    response.into_response()
}

/// 413 when the body outgrew the limit, 400 for any other read failure
/// (client abort, malformed chunking).
fn body_rejection(error: &axum::Error) -> Response {
    let mut source: Option<&(dyn StdError + 'static)> = Some(error);
    while let Some(err) = source {
        if err.is::<LengthLimitError>() {
            return Response::error(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large");
        }
        source = err.source();
    }
    Response::error(StatusCode::BAD_REQUEST, "Bad Request")
}
