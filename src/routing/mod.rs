//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path, method, headers, body)
//!     → dispatcher.rs (walk handlers in priority order)
//!     → matcher.rs (declared patterns, host OR path)
//!     → first handler response, or 404 Not Found
//!
//! Handler list (at startup):
//!     HandlerRegistry (name order)
//!     → priorities assigned
//!     → frozen inside the Dispatcher
//! ```
//!
//! # Design Decisions
//! - Handler list is immutable at runtime; only breaker state changes
//! - Deterministic: every request sees the same handler order
//! - First match wins

pub mod dispatcher;
pub mod matcher;

pub use dispatcher::{Dispatcher, HandlerInfo};
pub use matcher::Pattern;
