//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the router.
//! All types derive Serde traits for deserialization from the TOML config file.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the router.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouterConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Whole-request timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Dispatch behaviour (circuit breaker, default handler budget).
    pub dispatch: DispatchConfig,

    /// Handlers to register.
    pub handlers: HandlersConfig,

    /// Maintenance API settings.
    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Largest inbound body accepted, in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Outer safety net for a whole request, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Dispatch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Errors after which a handler is disabled for the process lifetime.
    pub breaker_threshold: u32,

    /// Budget for handlers that do not declare their own, in milliseconds.
    pub default_timeout_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            breaker_threshold: 5,
            default_timeout_ms: 500,
        }
    }
}

/// Which handlers to register.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HandlersConfig {
    /// Register the built-in `/_health` handler.
    pub health: bool,

    /// Minimum time between rule-file modification checks, per handler.
    /// Zero checks on every match.
    pub reload_interval_ms: u64,

    /// Declarative path-redirect handlers.
    pub redirects: Vec<RedirectHandlerConfig>,

    /// Host-based redirect/proxy handler.
    pub hosts: Option<HostsHandlerConfig>,
}

impl Default for HandlersConfig {
    fn default() -> Self {
        Self {
            health: true,
            reload_interval_ms: 1000,
            redirects: Vec::new(),
            hosts: None,
        }
    }
}

/// A redirect handler backed by a rule file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedirectHandlerConfig {
    /// Unique handler name; also orders priority.
    pub name: String,

    /// Path to the YAML rule file.
    pub file: PathBuf,

    /// Budget override in milliseconds (raise it for proxy rules).
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Connect timeout for proxy rules, in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

/// The host redirect/proxy handler.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HostsHandlerConfig {
    /// Unique handler name.
    #[serde(default = "default_hosts_name")]
    pub name: String,

    /// Path to the YAML rule file.
    pub file: PathBuf,

    /// Budget in milliseconds.
    #[serde(default = "default_hosts_timeout_ms")]
    pub timeout_ms: u64,

    /// Upstream connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_hosts_name() -> String {
    "hosts".to_string()
}

fn default_hosts_timeout_ms() -> u64 {
    5000
}

fn default_connect_timeout_ms() -> u64 {
    2000
}

/// Admin (maintenance) API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
