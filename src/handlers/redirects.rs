//! Declarative path redirects backed by a YAML rule file.
//!
//! ```yaml
//! domains: [go, go.lan]          # optional allow-list
//! redirects:
//!   - pattern: '^/g/(.+)$'
//!     target: 'https://google.com/search?q=${1}'
//!     description: Google search
//!   - pattern: '^/nas/(.*)$'
//!     target: 'http://10.0.0.2:5000/${1}'
//!     type: proxy
//! ```

use std::path::PathBuf;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};

use crate::handlers::rules::{ReloadableRules, RuleFormat, RuleKind};
use crate::handlers::{Handler, HandlerOutcome, HandlerResult};
use crate::http::{Request, Response};
use crate::upstream::Forwarder;

/// Redirects (or proxies) requests whose path matches a rule in the file.
#[derive(Debug)]
pub struct RedirectHandler {
    name: String,
    rules: ReloadableRules,
    forwarder: Forwarder,
    timeout: Duration,
}

impl RedirectHandler {
    pub fn new(
        name: &str,
        file: impl Into<PathBuf>,
        reload_interval: Duration,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            name: name.to_string(),
            rules: ReloadableRules::open(name, file, RuleFormat::Redirects, reload_interval),
            forwarder: Forwarder::new(connect_timeout),
            timeout,
        }
    }

    /// Pooled upstream clients used by proxy-typed rules.
    pub fn forwarder(&self) -> &Forwarder {
        &self.forwarder
    }
}

impl Handler for RedirectHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, host: &str, path: &str) -> bool {
        if !self.rules.snapshot().allows_host(host) {
            return false;
        }
        if self.rules.refresh() {
            self.forwarder.clear();
        }
        let rules = self.rules.snapshot();
        rules.allows_host(host) && rules.any_match(host, path)
    }

    fn handle<'a>(
        &'a self,
        host: &'a str,
        path: &'a str,
        request: &'a Request,
    ) -> BoxFuture<'a, HandlerResult> {
        async move {
            let rules = self.rules.snapshot();
            let Some(hit) = rules.first_match(host, path) else {
                return Ok(HandlerOutcome::NotApplicable);
            };
            tracing::debug!(
                handler = %self.name,
                pattern = %hit.rule.regex.as_str(),
                target = %hit.target,
                kind = ?hit.rule.kind,
                "Redirect rule matched"
            );
            let response = match hit.rule.kind {
                RuleKind::Redirect => Response::redirect(&hit.target),
                RuleKind::Proxy => self.forwarder.forward(&hit.target, request).await,
            };
            Ok(HandlerOutcome::Matched(response))
        }
        .boxed()
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn rule_count(&self) -> Option<usize> {
        Some(self.rules.snapshot().len())
    }
}
