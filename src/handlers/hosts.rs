//! Host-based redirects and reverse proxying backed by a YAML rule file.
//!
//! ```yaml
//! hosts:
//!   - pattern: 'sync\.lan'
//!     target: 'http://10.0.0.5:8384'
//!     type: proxy
//!     description: Syncthing
//!   - pattern: '^wiki\.lan$'
//!     target: 'http://wiki.example.com'
//! ```
//!
//! Rules are matched against the normalised host. The request path (with its
//! query) is appended to the target for both redirect and proxy rules.

use std::path::PathBuf;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};

use crate::handlers::rules::{ReloadableRules, RuleFormat, RuleKind};
use crate::handlers::{Handler, HandlerOutcome, HandlerResult};
use crate::http::{Request, Response};
use crate::upstream::{join_target, Forwarder};

/// Default budget for host handlers; they perform outbound calls.
pub const DEFAULT_HOSTS_TIMEOUT: Duration = Duration::from_secs(5);

/// Routes requests by host to a redirect or an upstream.
#[derive(Debug)]
pub struct HostsHandler {
    name: String,
    rules: ReloadableRules,
    forwarder: Forwarder,
    timeout: Duration,
}

impl HostsHandler {
    pub fn new(
        name: &str,
        file: impl Into<PathBuf>,
        reload_interval: Duration,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            name: name.to_string(),
            rules: ReloadableRules::open(name, file, RuleFormat::Hosts, reload_interval),
            forwarder: Forwarder::new(connect_timeout),
            timeout,
        }
    }

    /// Pooled upstream clients used by proxy rules.
    pub fn forwarder(&self) -> &Forwarder {
        &self.forwarder
    }
}

impl Handler for HostsHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, host: &str, _path: &str) -> bool {
        if host.is_empty() {
            return false;
        }
        if self.rules.refresh() {
            self.forwarder.clear();
        }
        self.rules.snapshot().any_match(host, host)
    }

    fn handle<'a>(
        &'a self,
        host: &'a str,
        path: &'a str,
        request: &'a Request,
    ) -> BoxFuture<'a, HandlerResult> {
        async move {
            let rules = self.rules.snapshot();
            let Some(hit) = rules.first_match(host, host) else {
                return Ok(HandlerOutcome::NotApplicable);
            };
            let target = join_target(&hit.target, path);
            tracing::debug!(
                handler = %self.name,
                host = %host,
                target = %target,
                kind = ?hit.rule.kind,
                "Host rule matched"
            );
            let response = match hit.rule.kind {
                RuleKind::Redirect => Response::redirect(&target),
                RuleKind::Proxy => self.forwarder.forward(&target, request).await,
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
