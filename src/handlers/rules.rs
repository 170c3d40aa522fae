//! Declarative rule files with lazy hot reload.
//!
//! # Responsibilities
//! - Parse redirect and host rule files (YAML) into compiled rule sets
//! - Reload when the file's modification time advances past the last load
//! - Publish each rule set with a single atomic swap
//! - Expand `${N}` capture placeholders in rule targets
//!
//! # Design Decisions
//! - No background watcher: the check runs lazily from `matches`, throttled
//!   per handler instance by `reload_interval`
//! - Readers take an `Arc` snapshot via `ArcSwap`, so a reload is observed
//!   entirely or not at all
//! - A file that is missing or malformed degrades to an empty rule set; the
//!   failure is logged once per transition and never reaches the request

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, TryLockError};
use std::time::{Duration, Instant, SystemTime};

use arc_swap::ArcSwap;
use regex::{Captures, Regex};
use serde::Deserialize;
use thiserror::Error;

use crate::observability::metrics;

/// Errors raised while loading a rule file.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed rule file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("rule {index}: invalid pattern `{pattern}`: {source}")]
    Pattern {
        index: usize,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// What a matching rule does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    /// Answer with a 302 to the expanded target.
    #[default]
    Redirect,
    /// Forward the request to the target and relay the upstream response.
    Proxy,
}

#[derive(Debug, Deserialize)]
struct RawRule {
    pattern: String,
    target: String,
    #[serde(default, rename = "type")]
    kind: RuleKind,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    domains: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RedirectFile {
    #[serde(default)]
    domains: Vec<String>,
    #[serde(default)]
    redirects: Vec<RawRule>,
}

#[derive(Debug, Default, Deserialize)]
struct HostsFile {
    #[serde(default)]
    hosts: Vec<RawRule>,
}

/// A compiled rule.
#[derive(Debug)]
pub struct Rule {
    pub regex: Regex,
    pub target: String,
    pub kind: RuleKind,
    pub description: Option<String>,
    /// Hosts this rule is restricted to. Empty means any host.
    pub domains: Vec<String>,
}

impl Rule {
    fn compile(index: usize, raw: RawRule) -> Result<Self, RuleError> {
        let regex = Regex::new(&raw.pattern).map_err(|source| RuleError::Pattern {
            index,
            pattern: raw.pattern.clone(),
            source,
        })?;
        Ok(Self {
            regex,
            target: raw.target,
            kind: raw.kind,
            description: raw.description,
            domains: normalize_domains(raw.domains),
        })
    }

    /// True if `host` passes this rule's allow-list.
    pub fn allows_host(&self, host: &str) -> bool {
        domain_allowed(&self.domains, host)
    }
}

/// An ordered rule set; the first matching rule wins.
#[derive(Debug, Default)]
pub struct RuleSet {
    /// File-level allow-list. Empty means any host.
    pub domains: Vec<String>,
    pub rules: Vec<Rule>,
}

/// A rule that applied to a request, with its target already expanded.
#[derive(Debug)]
pub struct RuleMatch<'a> {
    pub rule: &'a Rule,
    pub target: String,
}

impl RuleSet {
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// True if `host` passes the file-level allow-list.
    pub fn allows_host(&self, host: &str) -> bool {
        domain_allowed(&self.domains, host)
    }

    /// Whether any rule structurally matches `subject` for `host`.
    pub fn any_match(&self, host: &str, subject: &str) -> bool {
        self.rules
            .iter()
            .any(|rule| rule.allows_host(host) && rule.regex.is_match(subject))
    }

    /// First rule matching `subject` for `host`, target expanded.
    pub fn first_match(&self, host: &str, subject: &str) -> Option<RuleMatch<'_>> {
        self.rules.iter().find_map(|rule| {
            if !rule.allows_host(host) {
                return None;
            }
            rule.regex.captures(subject).map(|caps| RuleMatch {
                rule,
                target: expand_target(&rule.target, &caps),
            })
        })
    }
}

/// The on-disk layout of a rule file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFormat {
    /// `domains:` plus a `redirects:` list matched against the path.
    Redirects,
    /// A `hosts:` list matched against the host.
    Hosts,
}

impl RuleFormat {
    /// Parse and compile rule file contents.
    pub fn parse(self, source: &str) -> Result<RuleSet, RuleError> {
        if source.trim().is_empty() {
            return Ok(RuleSet::default());
        }
        let (domains, raw_rules) = match self {
            RuleFormat::Redirects => {
                let file: RedirectFile = serde_yaml::from_str(source)?;
                (file.domains, file.redirects)
            }
            RuleFormat::Hosts => {
                let file: HostsFile = serde_yaml::from_str(source)?;
                (Vec::new(), file.hosts)
            }
        };
        let rules = raw_rules
            .into_iter()
            .enumerate()
            .map(|(index, raw)| Rule::compile(index, raw))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RuleSet {
            domains: normalize_domains(domains),
            rules,
        })
    }

    /// Read and compile a rule file.
    pub fn load(self, path: &Path) -> Result<RuleSet, RuleError> {
        let source = fs::read_to_string(path).map_err(|source| RuleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse(&source)
    }
}

#[derive(Debug, Default)]
struct ReloadState {
    loaded_mtime: Option<SystemTime>,
    last_check: Option<Instant>,
    failing: bool,
}

/// A rule set backed by a file, reloaded when the file changes.
#[derive(Debug)]
pub struct ReloadableRules {
    owner: String,
    path: PathBuf,
    format: RuleFormat,
    interval: Duration,
    current: ArcSwap<RuleSet>,
    state: Mutex<ReloadState>,
}

impl ReloadableRules {
    /// Load `path` for the handler named `owner`.
    ///
    /// Never fails: an unreadable file yields an empty rule set until it
    /// becomes loadable.
    pub fn open(owner: &str, path: impl Into<PathBuf>, format: RuleFormat, interval: Duration) -> Self {
        let rules = Self {
            owner: owner.to_string(),
            path: path.into(),
            format,
            interval,
            current: ArcSwap::from_pointee(RuleSet::default()),
            state: Mutex::new(ReloadState::default()),
        };
        rules.refresh();
        rules
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The rule set currently in effect.
    pub fn snapshot(&self) -> Arc<RuleSet> {
        self.current.load_full()
    }

    /// Reload if the file changed since the last load.
    ///
    /// Returns `true` when a new rule set (possibly empty) was published.
    /// Checks closer together than the reload interval are skipped, as are
    /// checks racing with a reload already in progress.
    pub fn refresh(&self) -> bool {
        let mut state = match self.state.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return false,
        };
        if let Some(last) = state.last_check {
            if last.elapsed() < self.interval {
                return false;
            }
        }
        state.last_check = Some(Instant::now());

        let modified = match fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                if state.failing && state.loaded_mtime.is_none() {
                    return false;
                }
                tracing::warn!(
                    handler = %self.owner,
                    path = %self.path.display(),
                    error = %e,
                    "Rule file unavailable, handler inert until it loads"
                );
                state.loaded_mtime = None;
                state.failing = true;
                self.publish(RuleSet::default());
                return true;
            }
        };

        if state.loaded_mtime.is_some_and(|loaded| modified <= loaded) {
            return false;
        }
        state.loaded_mtime = Some(modified);

        match self.format.load(&self.path) {
            Ok(rules) => {
                tracing::info!(
                    handler = %self.owner,
                    path = %self.path.display(),
                    rules = rules.len(),
                    "Rule file loaded"
                );
                state.failing = false;
                self.publish(rules);
            }
            Err(e) => {
                tracing::warn!(
                    handler = %self.owner,
                    path = %self.path.display(),
                    error = %e,
                    "Rule file failed to load, using empty rule set"
                );
                state.failing = true;
                self.publish(RuleSet::default());
            }
        }
        true
    }

    fn publish(&self, rules: RuleSet) {
        self.current.store(Arc::new(rules));
        metrics::record_rule_reload(&self.owner);
    }
}

/// Substitute `${N}` placeholders with capture group `N`.
///
/// Groups that did not participate expand to the empty string; indices beyond
/// the pattern's group count are left as written.
pub fn expand_target(template: &str, caps: &Captures<'_>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let group = after
            .find('}')
            .and_then(|end| after[..end].parse::<usize>().ok().map(|n| (n, end)));
        match group {
            Some((n, end)) if n < caps.len() => {
                out.push_str(caps.get(n).map_or("", |m| m.as_str()));
                rest = &after[end + 1..];
            }
            _ => {
                out.push_str("${");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn normalize_domains(domains: Vec<String>) -> Vec<String> {
    domains
        .into_iter()
        .map(|d| d.trim().to_ascii_lowercase())
        .filter(|d| !d.is_empty())
        .collect()
}

fn domain_allowed(domains: &[String], host: &str) -> bool {
    domains.is_empty() || domains.iter().any(|d| d == host)
}
