//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher and handlers produce:
//!     → logging.rs (structured tracing events, request-id correlated)
//!     → metrics.rs (counters, histograms; Prometheus when enabled)
//!     → stats.rs (authoritative counters read by the admin API)
//! ```
//!
//! # Design Decisions
//! - Stats are owned by the dispatcher, not global
//! - Metrics are fire-and-forget and may be disabled entirely

pub mod logging;
pub mod metrics;
pub mod stats;
