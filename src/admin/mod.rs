//! Read-only maintenance API.
//!
//! Served on its own listener so it never competes with dispatched traffic
//! and never shows up in the handler list.

pub mod handlers;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::routing::Dispatcher;
use self::handlers::*;

pub fn setup_admin_router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/handlers", get(get_handlers))
        .route("/admin/stats", get(get_stats))
        .route("/admin/disabled", get(get_disabled))
        .route("/admin/resolve", get(get_resolve))
        .layer(TraceLayer::new_for_http())
        .with_state(dispatcher)
}
