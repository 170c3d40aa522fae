//! Timeout enforcement for handler invocations.
//!
//! # Responsibilities
//! - Wrap a handler invocation with its declared deadline
//! - Cancel the invocation cleanly on expiry (the future is dropped)
//! - Classify the result at the dispatch boundary
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from faults
//! - Panics inside the invocation are caught and reported as faults

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures_util::FutureExt;
use thiserror::Error;

/// Why a handler invocation failed at the dispatch boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AttemptError {
    /// The handler exceeded its declared budget.
    #[error("timeout after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The handler failed unexpectedly (error return or panic).
    #[error("{0}")]
    Fault(String),
}

impl AttemptError {
    /// Short tag used for metrics labels and stats.
    pub fn kind(&self) -> &'static str {
        match self {
            AttemptError::Timeout(_) => "timeout",
            AttemptError::Fault(_) => "fault",
        }
    }
}

/// Run `fut` under `limit`, converting expiry and panics into [`AttemptError`].
///
/// On expiry the future is dropped, abandoning any pending I/O it owns.
pub async fn run_with_deadline<F, T>(limit: Duration, fut: F) -> Result<T, AttemptError>
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(limit, AssertUnwindSafe(fut).catch_unwind()).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(panic)) => Err(AttemptError::Fault(panic_message(panic.as_ref()))),
        Err(_) => Err(AttemptError::Timeout(limit)),
    }
}

/// Best-effort extraction of a panic payload's message.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("panic: {}", msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("panic: {}", msg)
    } else {
        "panic".to_string()
    }
}
