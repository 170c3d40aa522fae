//! Dispatcher-owned aggregate statistics.
//!
//! Counters are plain atomics mutated only by the dispatch protocol. Snapshots
//! are serialisable so the admin API can return them as JSON.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::resilience::timeouts::AttemptError;

/// Process-wide request counters.
#[derive(Debug)]
pub struct DispatchStats {
    started_at: SystemTime,
    started: Instant,
    total_requests: AtomicU64,
    not_found: AtomicU64,
}

impl DispatchStats {
    pub fn new() -> Self {
        Self {
            started_at: SystemTime::now(),
            started: Instant::now(),
            total_requests: AtomicU64::new(0),
            not_found: AtomicU64::new(0),
        }
    }

    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_not_found(&self) {
        self.not_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    pub fn started_at_unix(&self) -> u64 {
        self.started_at
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    pub fn not_found(&self) -> u64 {
        self.not_found.load(Ordering::Relaxed)
    }
}

impl Default for DispatchStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-handler counters kept next to the handler's circuit breaker.
#[derive(Debug, Default)]
pub struct HandlerCounters {
    hits: AtomicU64,
    timeouts: AtomicU64,
    faults: AtomicU64,
    last_error: Mutex<Option<String>>,
}

impl HandlerCounters {
    /// A request answered by this handler.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// A failed invocation, tagged by kind.
    pub fn record_error(&self, error: &AttemptError) {
        match error {
            AttemptError::Timeout(_) => self.timeouts.fetch_add(1, Ordering::Relaxed),
            AttemptError::Fault(_) => self.faults.fetch_add(1, Ordering::Relaxed),
        };
        let mut last = self
            .last_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *last = Some(error.to_string());
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn timeouts(&self) -> u64 {
        self.timeouts.load(Ordering::Relaxed)
    }

    pub fn faults(&self) -> u64 {
        self.faults.load(Ordering::Relaxed)
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

/// Point-in-time view of the dispatcher's counters.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub started_at: u64,
    pub uptime_secs: u64,
    pub total_requests: u64,
    pub not_found: u64,
    pub handlers: Vec<HandlerStats>,
}

/// Counters for one handler.
#[derive(Debug, Clone, Serialize)]
pub struct HandlerStats {
    pub name: String,
    pub priority: usize,
    pub requests: u64,
    pub errors: u32,
    pub timeouts: u64,
    pub faults: u64,
    pub disabled: bool,
    pub last_error: Option<String>,
}
