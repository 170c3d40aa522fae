//! Per-handler circuit breaker.
//!
//! # States
//! - Closed: handler is consulted normally
//! - Open: handler is skipped for the rest of the process lifetime
//!
//! # State Transitions
//! ```text
//! Closed → Open: error_count reaches threshold (one-way)
//! ```
//! There is no half-open state. Recovery is a process restart.
//!
//! # Concurrency
//! The counter saturates at the threshold through a single atomic update, so
//! among concurrent failures exactly one observes the crossing.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Default number of errors after which a handler is disabled.
pub const DEFAULT_THRESHOLD: u32 = 5;

/// Error counter plus one-way disabled flag for a single handler.
#[derive(Debug)]
pub struct CircuitBreaker {
    threshold: u32,
    errors: AtomicU32,
    open: AtomicBool,
}

impl CircuitBreaker {
    /// Create a closed breaker that opens after `threshold` errors.
    ///
    /// A threshold of zero is treated as one.
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            errors: AtomicU32::new(0),
            open: AtomicBool::new(false),
        }
    }

    /// True once the handler has been disabled.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Number of errors recorded so far.
    pub fn error_count(&self) -> u32 {
        self.errors.load(Ordering::Acquire)
    }


    /// Record one failure.
    ///
    /// Returns `true` only for the failure that trips the breaker. Failures
    /// reported after the breaker opened (in-flight invocations that started
    /// earlier) are not counted.
    pub fn record_failure(&self) -> bool {
        let counted = self
            .errors
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.threshold).then_some(n + 1)
            });
        match counted {
            Ok(previous) if previous + 1 == self.threshold => {
                self.open.store(true, Ordering::Release);
                true
            }
            _ => false,
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}
