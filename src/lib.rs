//! LAN request router.
//!
//! A small HTTP front end that offers every request to an ordered list of
//! handlers and returns the first answer.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server (request id, body limit, catch-panic)
//!                          │
//!                          ▼
//!                    routing::Dispatcher ──▶ handlers (priority order)
//!                          │                   ├─ health
//!                          │                   ├─ redirects (YAML rules)
//!                          │                   └─ hosts (YAML rules)
//!                          │                          │
//!                          │                          ▼
//!                          │                  upstream::Forwarder ──▶ LAN service
//!                          ▼
//!     ◀────────────── first response, or 404
//!
//!     Cross-cutting: config, resilience (timeouts, circuit breaker),
//!     observability (logs, metrics, stats), lifecycle, admin API
//! ```

// Core subsystems
pub mod config;
pub mod handlers;
pub mod http;
pub mod routing;
pub mod upstream;

// Cross-cutting concerns
pub mod admin;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::RouterConfig;
pub use handlers::{Handler, HandlerOutcome, HandlerResult};
pub use http::{HttpServer, Request, Response};
pub use lifecycle::Shutdown;
pub use routing::Dispatcher;
