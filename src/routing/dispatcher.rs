//! Request dispatch across the ordered handler list.
//!
//! # Responsibilities
//! - Own the handler list (immutable after startup) with per-handler circuit
//!   breakers and counters
//! - Run the match → timeout → invoke → record protocol for every request
//! - Return the first handler response, or 404 when every handler declines
//! - Expose read-only views for the admin surface
//!
//! # Protocol
//! ```text
//! total_requests += 1
//! for handler in priority order:
//!     disabled?            → skip (not invoked, not counted)
//!     matches(host, path)? → no: next     (panic: fault)
//!     handle(...) under handler.timeout():
//!         Matched(resp)  → hits += 1, return resp
//!         NotApplicable  → next
//!         timeout/fault  → errors += 1 (disable at threshold), next
//! return 404 Not Found
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::handlers::{Handler, HandlerOutcome, RegisteredHandler};
use crate::http::{Request, Response};
use crate::observability::metrics;
use crate::observability::stats::{DispatchStats, HandlerCounters, HandlerStats, StatsSnapshot};
use crate::resilience::circuit_breaker::{CircuitBreaker, DEFAULT_THRESHOLD};
use crate::resilience::timeouts::{panic_message, run_with_deadline, AttemptError};

/// One registered handler plus its failure-isolation state.
struct HandlerSlot {
    priority: usize,
    handler: Arc<dyn Handler>,
    breaker: CircuitBreaker,
    counters: HandlerCounters,
}

/// Outcome of offering a request to a single handler.
enum Attempt {
    Matched(Response),
    NotApplicable,
    Failed(AttemptError),
}

/// Static description of a registered handler.
#[derive(Debug, Clone, Serialize)]
pub struct HandlerInfo {
    pub name: String,
    pub priority: usize,
    pub pattern: Option<String>,
    pub timeout_ms: u64,
    pub disabled: bool,
    pub rules: Option<usize>,
}

/// First-match-wins dispatcher.
pub struct Dispatcher {
    slots: Vec<HandlerSlot>,
    stats: DispatchStats,
}

impl Dispatcher {
    /// Build a dispatcher whose breakers open after `breaker_threshold` errors.
    ///
    /// Handlers are consulted in ascending priority.
    pub fn new(handlers: Vec<RegisteredHandler>, breaker_threshold: u32) -> Self {
        let mut slots: Vec<HandlerSlot> = handlers
            .into_iter()
            .map(|registered| HandlerSlot {
                priority: registered.priority,
                handler: registered.handler,
                breaker: CircuitBreaker::new(breaker_threshold),
                counters: HandlerCounters::default(),
            })
            .collect();
        slots.sort_by_key(|slot| slot.priority);
        Self {
            slots,
            stats: DispatchStats::new(),
        }
    }

    /// Build from handlers in the given order with the default threshold.
    pub fn from_handlers(handlers: Vec<Arc<dyn Handler>>) -> Self {
        let registered = handlers
            .into_iter()
            .enumerate()
            .map(|(priority, handler)| RegisteredHandler { priority, handler })
            .collect();
        Self::new(registered, DEFAULT_THRESHOLD)
    }

    /// Dispatch one request.
    pub async fn dispatch(&self, request: &Request) -> Response {
        let start = Instant::now();
        self.stats.record_request();

        let host = request.host.as_str();
        let path = request.path();

        for slot in &self.slots {
            let name = slot.handler.name();
            if slot.breaker.is_open() {
                continue;
            }

            match Self::check_match(slot, host, path) {
                Ok(false) => continue,
                Ok(true) => {}
                Err(e) => {
                    self.record_failure(slot, request, e);
                    continue;
                }
            }

            match Self::invoke(slot, host, path, request).await {
                Attempt::Matched(response) => {
                    slot.counters.record_hit();
                    metrics::record_handler_hit(name);
                    tracing::debug!(
                        request_id = %request.request_id(),
                        handler = %name,
                        priority = slot.priority,
                        status = response.status.as_u16(),
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Request handled"
                    );
                    return response;
                }
                Attempt::NotApplicable => {
                    tracing::trace!(handler = %name, path = %path, "Handler declined");
                }
                Attempt::Failed(e) => self.record_failure(slot, request, e),
            }
        }

        self.stats.record_not_found();
        tracing::debug!(
            request_id = %request.request_id(),
            host = %host,
            path = %path,
            "No handler matched"
        );
        Response::not_found()
    }

    fn check_match(slot: &HandlerSlot, host: &str, path: &str) -> Result<bool, AttemptError> {
        panic::catch_unwind(AssertUnwindSafe(|| slot.handler.matches(host, path)))
            .map_err(|payload| AttemptError::Fault(panic_message(payload.as_ref())))
    }

    async fn invoke(slot: &HandlerSlot, host: &str, path: &str, request: &Request) -> Attempt {
        let limit = slot.handler.timeout();
        // `handle` may panic before returning its future; call it inside the guard.
        let attempt = async move { slot.handler.handle(host, path, request).await };
        match run_with_deadline(limit, attempt).await {
            Ok(Ok(HandlerOutcome::Matched(response))) => Attempt::Matched(response),
            Ok(Ok(HandlerOutcome::NotApplicable)) => Attempt::NotApplicable,
            Ok(Err(e)) => Attempt::Failed(AttemptError::Fault(e.to_string())),
            Err(e) => Attempt::Failed(e),
        }
    }

    fn record_failure(&self, slot: &HandlerSlot, request: &Request, error: AttemptError) {
        let name = slot.handler.name();
        let kind = error.kind();
        tracing::warn!(
            request_id = %request.request_id(),
            handler = %name,
            kind,
            error = %error,
            "Handler error"
        );
        metrics::record_handler_error(name, kind);
        slot.counters.record_error(&error);

        if slot.breaker.record_failure() {
            metrics::record_handler_disabled(name);
            tracing::error!(
                handler = %name,
                errors = slot.breaker.error_count(),
                "Handler disabled after repeated errors"
            );
        }
    }

    /// Registered handlers in priority order.
    pub fn handlers(&self) -> Vec<HandlerInfo> {
        self.slots.iter().map(Self::info).collect()
    }

    fn info(slot: &HandlerSlot) -> HandlerInfo {
        HandlerInfo {
            name: slot.handler.name().to_string(),
            priority: slot.priority,
            pattern: slot.handler.pattern().map(|p| p.as_str().to_string()),
            timeout_ms: duration_ms(slot.handler.timeout()),
            disabled: slot.breaker.is_open(),
            rules: slot.handler.rule_count(),
        }
    }

    /// Names of handlers disabled by their circuit breaker.
    pub fn disabled(&self) -> Vec<String> {
        self.slots
            .iter()
            .filter(|slot| slot.breaker.is_open())
            .map(|slot| slot.handler.name().to_string())
            .collect()
    }

    /// Whether the named handler has been disabled.
    pub fn is_disabled(&self, name: &str) -> bool {
        self.slots
            .iter()
            .any(|slot| slot.handler.name() == name && slot.breaker.is_open())
    }

    /// Live counters.
    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            started_at: self.stats.started_at_unix(),
            uptime_secs: self.stats.uptime_secs(),
            total_requests: self.stats.total_requests(),
            not_found: self.stats.not_found(),
            handlers: self
                .slots
                .iter()
                .map(|slot| HandlerStats {
                    name: slot.handler.name().to_string(),
                    priority: slot.priority,
                    requests: slot.counters.hits(),
                    errors: slot.breaker.error_count(),
                    timeouts: slot.counters.timeouts(),
                    faults: slot.counters.faults(),
                    disabled: slot.breaker.is_open(),
                    last_error: slot.counters.last_error(),
                })
                .collect(),
        }
    }

    /// The handler that would be asked first to serve `host` + `path`,
    /// without invoking it.
    pub fn resolve(&self, host: &str, path: &str) -> Option<HandlerInfo> {
        self.slots
            .iter()
            .filter(|slot| !slot.breaker.is_open())
            .find(|slot| Self::check_match(slot, host, path).unwrap_or(false))
            .map(Self::info)
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
