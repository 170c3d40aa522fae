//! Handler subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (lifecycle::startup):
//!     HandlerConfig[]
//!     → registry.rs (constructors sorted by name, failures logged and skipped)
//!     → Vec<RegisteredHandler> handed to the dispatcher
//!
//! Per request (routing::dispatcher):
//!     matches(host, path)  → cheap predicate
//!     handle(host, path, request) → Matched(response) | NotApplicable | Err(fault)
//!
//! Config-backed handlers (redirects.rs, hosts.rs):
//!     matches() → rules.rs refresh (mtime check, throttled) → atomic swap
//! ```
//!
//! # Design Decisions
//! - Handlers are trait objects; priority comes from registration order
//! - "No answer" is an explicit `HandlerOutcome::NotApplicable`, not an error
//! - Errors are reserved for genuine failures and feed the circuit breaker

pub mod health;
pub mod hosts;
pub mod redirects;
pub mod registry;
pub mod rules;

use std::time::Duration;

use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::http::{Request, Response};
use crate::routing::Pattern;

pub use registry::{HandlerRegistry, RegisteredHandler};

/// Budget applied to handlers that do not declare their own.
pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_millis(500);

/// Result of a successful handler invocation.
#[derive(Debug)]
pub enum HandlerOutcome {
    /// The handler produced the response for this request.
    Matched(Response),
    /// The pattern matched but no concrete rule applies; try the next handler.
    NotApplicable,
}

/// Genuine handler failures.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The handler could not be constructed at startup.
    #[error("failed to construct handler `{name}`: {reason}")]
    Construction { name: String, reason: String },

    /// The handler failed while producing a response.
    #[error("{0}")]
    Fault(String),
}

/// What handlers return from `handle`.
pub type HandlerResult = Result<HandlerOutcome, HandlerError>;

/// The capability contract every handler implements.
///
/// Handlers must be cheap to share across tasks; per-request state lives in
/// the returned future.
pub trait Handler: Send + Sync {
    /// Stable, unique name.
    fn name(&self) -> &str;

    /// Declared static pattern, or `None` when matching is fully custom.
    fn pattern(&self) -> Option<&Pattern> {
        None
    }

    /// Whether this handler claims the request.
    ///
    /// The default tests the declared pattern against host OR path. Overrides
    /// that still rely on a static pattern should call [`pattern_matches`].
    fn matches(&self, host: &str, path: &str) -> bool {
        pattern_matches(self.pattern(), host, path)
    }

    /// Produce a response, or decline with `NotApplicable`.
    fn handle<'a>(
        &'a self,
        host: &'a str,
        path: &'a str,
        request: &'a Request,
    ) -> BoxFuture<'a, HandlerResult>;

    /// Deadline for one `handle` invocation.
    fn timeout(&self) -> Duration {
        DEFAULT_HANDLER_TIMEOUT
    }

    /// Number of loaded rules, for config-backed handlers.
    fn rule_count(&self) -> Option<usize> {
        None
    }
}

/// Base predicate: a declared pattern matched against host or path.
pub fn pattern_matches(pattern: Option<&Pattern>, host: &str, path: &str) -> bool {
    pattern.is_some_and(|p| p.matches(host, path))
}
