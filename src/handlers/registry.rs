//! Explicit handler registry.
//!
//! Bootstrap code registers one constructor per available handler. `build`
//! orders them by name (the deterministic priority order), runs each
//! constructor, and skips any that fail, so a single broken handler never
//! aborts startup.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::handlers::{Handler, HandlerError};
use crate::resilience::timeouts::panic_message;

type Constructor = Box<dyn FnOnce() -> Result<Arc<dyn Handler>, HandlerError> + Send>;

/// A handler that survived construction, with its priority.
pub struct RegisteredHandler {
    /// Position in dispatch order; lower is consulted first.
    pub priority: usize,
    pub handler: Arc<dyn Handler>,
}

/// Collects handler constructors before the dispatcher is built.
#[derive(Default)]
pub struct HandlerRegistry {
    entries: Vec<(String, Constructor)>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor under `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: FnOnce() -> Result<Arc<dyn Handler>, HandlerError> + Send + 'static,
    {
        self.entries.push((name.into(), Box::new(constructor)));
    }

    /// Number of registered constructors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Construct every handler in name order.
    ///
    /// Construction errors and panics are logged and the handler is left out.
    /// Priorities are contiguous over the handlers that were built.
    pub fn build(mut self) -> Vec<RegisteredHandler> {
        self.entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut built = Vec::with_capacity(self.entries.len());
        for (name, constructor) in self.entries {
            let result = panic::catch_unwind(AssertUnwindSafe(constructor))
                .unwrap_or_else(|payload| {
                    Err(HandlerError::Construction {
                        name: name.clone(),
                        reason: panic_message(payload.as_ref()),
                    })
                });
            match result {
                Ok(handler) => {
                    let priority = built.len();
                    tracing::info!(
                        handler = %name,
                        priority,
                        pattern = handler.pattern().map(|p| p.as_str()).unwrap_or("-"),
                        timeout_ms = handler.timeout().as_millis() as u64,
                        "Handler registered"
                    );
                    built.push(RegisteredHandler { priority, handler });
                }
                Err(e) => {
                    tracing::error!(handler = %name, error = %e, "Handler failed to load, skipping");
                }
            }
        }
        built
    }
}
