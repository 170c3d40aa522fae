//! Built-in liveness handler.

use futures_util::future::{BoxFuture, FutureExt};

use crate::handlers::{Handler, HandlerOutcome, HandlerResult};
use crate::http::{Request, Response};
use crate::routing::Pattern;

/// Answers `/_health` with `{"status":"ok"}`.
#[derive(Debug)]
pub struct HealthHandler {
    name: String,
    pattern: Pattern,
}

impl HealthHandler {
    pub const PATH_PATTERN: &'static str = r"^/_health(\?.*)?$";

    pub fn new(name: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.to_string(),
            pattern: Pattern::new(Self::PATH_PATTERN)?,
        })
    }
}

impl Handler for HealthHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn pattern(&self) -> Option<&Pattern> {
        Some(&self.pattern)
    }

    fn handle<'a>(
        &'a self,
        _host: &'a str,
        _path: &'a str,
        _request: &'a Request,
    ) -> BoxFuture<'a, HandlerResult> {
        async move {
            Ok(HandlerOutcome::Matched(Response::json(&serde_json::json!({
                "status": "ok",
            }))))
        }
        .boxed()
    }
}
