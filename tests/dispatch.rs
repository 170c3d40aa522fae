//! Dispatch protocol tests: ordering, failure isolation and the circuit breaker.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::StatusCode;
use futures_util::future::{BoxFuture, FutureExt};
use lan_router::handlers::{Handler, HandlerError, HandlerOutcome, HandlerResult};
use lan_router::http::{Request, Response};
use lan_router::routing::{Dispatcher, Pattern};

enum Behavior {
    Respond(&'static str),
    Decline,
    Fail,
    Sleep(Duration),
    Panic,
    PanicEagerly,
}

struct Scripted {
    name: &'static str,
    pattern: Pattern,
    behavior: Behavior,
    timeout: Duration,
    calls: AtomicUsize,
    panic_in_match: bool,
}

impl Scripted {
    fn new(name: &'static str, pattern: &str, behavior: Behavior) -> Self {
        Self {
            name,
            pattern: Pattern::new(pattern).unwrap(),
            behavior,
            timeout: Duration::from_millis(500),
            calls: AtomicUsize::new(0),
            panic_in_match: false,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Handler for Scripted {
    fn name(&self) -> &str {
        self.name
    }

    fn pattern(&self) -> Option<&Pattern> {
        Some(&self.pattern)
    }

    fn matches(&self, host: &str, path: &str) -> bool {
        if self.panic_in_match {
            panic!("matcher exploded");
        }
        self.pattern.matches(host, path)
    }

    fn handle<'a>(
        &'a self,
        _host: &'a str,
        _path: &'a str,
        _request: &'a Request,
    ) -> BoxFuture<'a, HandlerResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if matches!(self.behavior, Behavior::PanicEagerly) {
            panic!("handler bug before any await");
        }
        async move {
            match &self.behavior {
                Behavior::Respond(body) => Ok(HandlerOutcome::Matched(Response::text(*body))),
                Behavior::Decline => Ok(HandlerOutcome::NotApplicable),
                Behavior::Fail => Err(HandlerError::Fault("backend exploded".into())),
                Behavior::Sleep(d) => {
                    tokio::time::sleep(*d).await;
                    Ok(HandlerOutcome::Matched(Response::text("slow")))
                }
                Behavior::Panic | Behavior::PanicEagerly => panic!("handler bug"),
            }
        }
        .boxed()
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}

fn dispatcher(handlers: &[Arc<Scripted>]) -> Dispatcher {
    Dispatcher::from_handlers(
        handlers
            .iter()
            .map(|h| h.clone() as Arc<dyn Handler>)
            .collect(),
    )
}

fn body(resp: &Response) -> &str {
    std::str::from_utf8(&resp.body).unwrap()
}

#[tokio::test]
async fn first_matching_handler_wins() {
    let first = Arc::new(Scripted::new("first", "^/", Behavior::Respond("first")));
    let second = Arc::new(Scripted::new("second", "^/", Behavior::Respond("second")));
    let d = dispatcher(&[first.clone(), second.clone()]);

    let resp = d.dispatch(&Request::get("router.lan", "/anything")).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(body(&resp), "first");
    assert_eq!(second.calls(), 0);
}

#[tokio::test]
async fn non_matching_handlers_are_skipped() {
    let docs = Arc::new(Scripted::new("docs", "^/docs", Behavior::Respond("docs")));
    let wiki = Arc::new(Scripted::new("wiki", "^/wiki", Behavior::Respond("wiki")));
    let d = dispatcher(&[docs.clone(), wiki.clone()]);

    let resp = d.dispatch(&Request::get("router.lan", "/wiki/Home")).await;
    assert_eq!(body(&resp), "wiki");
    assert_eq!(docs.calls(), 0);
}

#[tokio::test]
async fn pattern_may_match_host_instead_of_path() {
    let nas = Arc::new(Scripted::new("nas", r"^nas\.lan$", Behavior::Respond("nas")));
    let d = dispatcher(&[nas]);

    let resp = d.dispatch(&Request::get("NAS.lan:8080", "/files")).await;
    assert_eq!(body(&resp), "nas");
}

#[tokio::test]
async fn no_match_is_plain_404() {
    let docs = Arc::new(Scripted::new("docs", "^/docs", Behavior::Respond("docs")));
    let d = dispatcher(&[docs]);

    let resp = d.dispatch(&Request::get("router.lan", "/nope")).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(body(&resp), "Not Found");
    assert_eq!(d.stats().not_found, 1);
}

#[tokio::test]
async fn empty_dispatcher_answers_404() {
    let d = Dispatcher::from_handlers(Vec::new());
    let resp = d.dispatch(&Request::get("", "/")).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn not_applicable_falls_through_without_error() {
    let picky = Arc::new(Scripted::new("picky", "^/", Behavior::Decline));
    let fallback = Arc::new(Scripted::new("fallback", "^/", Behavior::Respond("fallback")));
    let d = dispatcher(&[picky.clone(), fallback]);

    for _ in 0..10 {
        let resp = d.dispatch(&Request::get("router.lan", "/x")).await;
        assert_eq!(body(&resp), "fallback");
    }
    let stats = d.stats();
    assert_eq!(stats.handlers[0].errors, 0);
    assert!(!d.is_disabled("picky"));
    assert_eq!(picky.calls(), 10);
}

#[tokio::test]
async fn breaker_disables_after_five_errors() {
    let broken = Arc::new(Scripted::new("broken", "^/", Behavior::Fail));
    let fallback = Arc::new(Scripted::new("fallback", "^/", Behavior::Respond("fallback")));
    let d = dispatcher(&[broken.clone(), fallback.clone()]);

    for i in 1..=5 {
        let resp = d.dispatch(&Request::get("router.lan", "/")).await;
        assert_eq!(body(&resp), "fallback", "request {} should fall through", i);
    }
    assert!(d.is_disabled("broken"));
    assert_eq!(d.disabled(), vec!["broken".to_string()]);

    for _ in 0..3 {
        let resp = d.dispatch(&Request::get("router.lan", "/")).await;
        assert_eq!(body(&resp), "fallback");
    }
    assert_eq!(broken.calls(), 5);

    let stats = d.stats();
    let broken_stats = &stats.handlers[0];
    assert_eq!(broken_stats.errors, 5);
    assert_eq!(broken_stats.faults, 5);
    assert!(broken_stats.disabled);
    assert!(broken_stats.last_error.as_deref().unwrap().contains("backend exploded"));
    assert_eq!(stats.handlers[1].requests, 8);
    assert_eq!(stats.total_requests, 8);
}

#[tokio::test]
async fn four_errors_keep_handler_enabled() {
    let broken = Arc::new(Scripted::new("broken", "^/fail", Behavior::Fail));
    let d = dispatcher(&[broken.clone()]);

    for _ in 0..4 {
        d.dispatch(&Request::get("router.lan", "/fail")).await;
    }
    assert!(!d.is_disabled("broken"));
    d.dispatch(&Request::get("router.lan", "/fail")).await;
    assert!(d.is_disabled("broken"));
}

#[tokio::test]
async fn slow_handler_times_out_and_next_one_answers() {
    let mut slow = Scripted::new("slow", "^/", Behavior::Sleep(Duration::from_secs(2)));
    slow.timeout = Duration::from_millis(500);
    let slow = Arc::new(slow);
    let fast = Arc::new(Scripted::new("fast", "^/", Behavior::Respond("fast")));
    let d = dispatcher(&[slow, fast]);

    let start = Instant::now();
    let resp = d.dispatch(&Request::get("router.lan", "/")).await;
    let elapsed = start.elapsed();

    assert_eq!(body(&resp), "fast");
    assert!(elapsed >= Duration::from_millis(450), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(1500), "elapsed {:?}", elapsed);

    let stats = d.stats();
    assert_eq!(stats.handlers[0].timeouts, 1);
    assert_eq!(stats.handlers[0].errors, 1);
    assert!(stats.handlers[0].last_error.as_deref().unwrap().contains("timeout"));
}

#[tokio::test]
async fn slow_handler_does_not_stall_concurrent_requests() {
    let mut slow = Scripted::new("slow", "^/slow", Behavior::Sleep(Duration::from_millis(400)));
    slow.timeout = Duration::from_secs(1);
    let fast = Scripted::new("fast", "^/fast", Behavior::Respond("fast"));
    let d = Arc::new(dispatcher(&[Arc::new(slow), Arc::new(fast)]));

    let slow_task = {
        let d = d.clone();
        tokio::spawn(async move { d.dispatch(&Request::get("router.lan", "/slow")).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let start = Instant::now();
    let resp = d.dispatch(&Request::get("router.lan", "/fast")).await;
    assert_eq!(body(&resp), "fast");
    assert!(start.elapsed() < Duration::from_millis(200));

    let slow_resp = slow_task.await.unwrap();
    assert_eq!(body(&slow_resp), "slow");
}

#[tokio::test]
async fn panics_are_counted_as_faults() {
    let panicky = Arc::new(Scripted::new("panicky", "^/", Behavior::Panic));
    let mut bad_matcher = Scripted::new("bad-matcher", "^/", Behavior::Respond("never"));
    bad_matcher.panic_in_match = true;
    let bad_matcher = Arc::new(bad_matcher);
    let eager = Arc::new(Scripted::new("eager", "^/", Behavior::PanicEagerly));
    let fallback = Arc::new(Scripted::new("fallback", "^/", Behavior::Respond("fallback")));
    let d = dispatcher(&[panicky, bad_matcher.clone(), eager.clone(), fallback]);

    let resp = d.dispatch(&Request::get("router.lan", "/")).await;
    assert_eq!(body(&resp), "fallback");

    let stats = d.stats();
    assert_eq!(stats.handlers[0].faults, 1);
    assert_eq!(stats.handlers[1].faults, 1);
    assert_eq!(stats.handlers[2].faults, 1);
    assert_eq!(stats.handlers[2].errors, 1);
    assert_eq!(bad_matcher.calls(), 0);
    assert_eq!(eager.calls(), 1);
}

#[tokio::test]
async fn concurrent_failures_trip_breaker_once() {
    let broken = Arc::new(Scripted::new("broken", "^/", Behavior::Fail));
    let d = Arc::new(dispatcher(&[broken.clone()]));

    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let d = d.clone();
            tokio::spawn(async move { d.dispatch(&Request::get("router.lan", "/")).await })
        })
        .collect();
    for task in tasks {
        let resp = task.await.unwrap();
        assert_eq!(resp.status, StatusCode::NOT_FOUND);
    }

    assert!(d.is_disabled("broken"));
    let stats = d.stats();
    assert_eq!(stats.handlers[0].errors, 5);
    assert_eq!(stats.total_requests, 32);
}

#[tokio::test]
async fn resolve_reports_first_claimant_without_invoking() {
    let docs = Arc::new(Scripted::new("docs", "^/docs", Behavior::Respond("docs")));
    let any = Arc::new(Scripted::new("any", "^/", Behavior::Respond("any")));
    let d = dispatcher(&[docs.clone(), any]);

    let info = d.resolve("router.lan", "/docs/intro").unwrap();
    assert_eq!(info.name, "docs");
    assert_eq!(info.priority, 0);
    assert_eq!(info.pattern.as_deref(), Some("^/docs"));
    assert_eq!(d.resolve("router.lan", "/other").unwrap().name, "any");
    assert_eq!(docs.calls(), 0);

    let none = dispatcher(&[docs]);
    assert!(none.resolve("router.lan", "/other").is_none());
}
