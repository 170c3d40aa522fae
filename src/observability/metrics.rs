//! Metrics collection and exposition.
//!
//! # Metrics
//! - `router_requests_total` (counter): requests by final status
//! - `router_request_duration_seconds` (histogram): end-to-end dispatch latency
//! - `router_handler_hits_total` (counter): requests answered, by handler
//! - `router_handler_errors_total` (counter): timeouts/faults, by handler and kind
//! - `router_handler_disabled_total` (counter): circuit breaker trips, by handler
//! - `router_rule_reloads_total` (counter): rule sets published, by handler
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(status: u16, start: Instant) {
    counter!("router_requests_total", "status" => status.to_string()).increment(1);
    histogram!("router_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_handler_hit(handler: &str) {
    counter!("router_handler_hits_total", "handler" => handler.to_string()).increment(1);
}

pub fn record_handler_error(handler: &str, kind: &'static str) {
    counter!(
        "router_handler_errors_total",
        "handler" => handler.to_string(),
        "kind" => kind
    )
    .increment(1);
}

pub fn record_handler_disabled(handler: &str) {
    counter!("router_handler_disabled_total", "handler" => handler.to_string()).increment(1);
}

pub fn record_rule_reload(handler: &str) {
    counter!("router_rule_reloads_total", "handler" => handler.to_string()).increment(1);
}
