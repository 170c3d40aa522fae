//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Handler invocation:
//!     → timeouts.rs (enforce the handler's declared deadline, catch panics)
//!     → On timeout/fault: circuit_breaker.rs (count, disable at threshold)
//! ```
//!
//! # Design Decisions
//! - Every handler invocation has a deadline
//! - No retries: a failed handler simply yields to the next one
//! - Disabling is one-way for the process lifetime

pub mod circuit_breaker;
pub mod timeouts;

pub use circuit_breaker::CircuitBreaker;
pub use timeouts::{run_with_deadline, AttemptError};
