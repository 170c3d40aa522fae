use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::http::request::normalize_host;
use crate::observability::stats::StatsSnapshot;
use crate::routing::{Dispatcher, HandlerInfo};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
    pub handlers: usize,
    pub disabled: usize,
}

#[derive(Deserialize)]
pub struct ResolveQuery {
    pub path: String,
    #[serde(default)]
    pub host: String,
}

#[derive(Serialize)]
pub struct Resolution {
    pub host: String,
    pub path: String,
    /// First handler that claims the request, or `None` for a 404.
    pub handler: Option<HandlerInfo>,
}

pub async fn get_status(State(dispatcher): State<Arc<Dispatcher>>) -> Json<SystemStatus> {
    let stats = dispatcher.stats();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        uptime_secs: stats.uptime_secs,
        handlers: stats.handlers.len(),
        disabled: stats.handlers.iter().filter(|h| h.disabled).count(),
    })
}

pub async fn get_handlers(State(dispatcher): State<Arc<Dispatcher>>) -> Json<Vec<HandlerInfo>> {
    Json(dispatcher.handlers())
}

pub async fn get_stats(State(dispatcher): State<Arc<Dispatcher>>) -> Json<StatsSnapshot> {
    Json(dispatcher.stats())
}

pub async fn get_disabled(State(dispatcher): State<Arc<Dispatcher>>) -> Json<Vec<String>> {
    Json(dispatcher.disabled())
}

pub async fn get_resolve(
    State(dispatcher): State<Arc<Dispatcher>>,
    Query(query): Query<ResolveQuery>,
) -> Json<Resolution> {
    let host = normalize_host(&query.host);
    let handler = dispatcher.resolve(&host, &query.path);
    Json(Resolution {
        host,
        path: query.path,
        handler,
    })
}
