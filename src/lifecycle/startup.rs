//! Startup orchestration.
//!
//! # Responsibilities
//! - Register one constructor per configured handler
//! - Build the dispatcher from the handlers that loaded
//! - Start the metrics exporter and the admin API when enabled
//! - Bind listeners and begin accepting traffic
//!
//! # Design Decisions
//! - A handler that fails to construct is skipped, never fatal
//! - Binding errors are fatal
//! - Listeners start last (traffic only when ready)

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::admin::setup_admin_router;
use crate::config::RouterConfig;
use crate::config::validation::HEALTH_HANDLER_NAME;
use crate::handlers::health::HealthHandler;
use crate::handlers::hosts::HostsHandler;
use crate::handlers::redirects::RedirectHandler;
use crate::handlers::{Handler, HandlerError, HandlerRegistry};
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::spawn_signal_listener;
use crate::observability::metrics;
use crate::routing::Dispatcher;

/// Fatal startup failures.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Register every handler named in `config`.
pub fn build_registry(config: &RouterConfig) -> HandlerRegistry {
    let handlers = &config.handlers;
    let reload_interval = Duration::from_millis(handlers.reload_interval_ms);
    let default_timeout = Duration::from_millis(config.dispatch.default_timeout_ms);
    let mut registry = HandlerRegistry::new();

    if handlers.health {
        registry.register(HEALTH_HANDLER_NAME, || {
            let handler =
                HealthHandler::new(HEALTH_HANDLER_NAME).map_err(|e| HandlerError::Construction {
                    name: HEALTH_HANDLER_NAME.to_string(),
                    reason: e.to_string(),
                })?;
            Ok(Arc::new(handler) as Arc<dyn Handler>)
        });
    }

    for redirect in &handlers.redirects {
        let redirect = redirect.clone();
        let timeout = redirect
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(default_timeout);
        registry.register(redirect.name.clone(), move || {
            Ok(Arc::new(RedirectHandler::new(
                &redirect.name,
                redirect.file,
                reload_interval,
                timeout,
                Duration::from_millis(redirect.connect_timeout_ms),
            )) as Arc<dyn Handler>)
        });
    }

    if let Some(hosts) = &handlers.hosts {
        let hosts = hosts.clone();
        registry.register(hosts.name.clone(), move || {
            Ok(Arc::new(HostsHandler::new(
                &hosts.name,
                hosts.file,
                reload_interval,
                Duration::from_millis(hosts.timeout_ms),
                Duration::from_millis(hosts.connect_timeout_ms),
            )) as Arc<dyn Handler>)
        });
    }

    registry
}

/// Build the dispatcher for `config`.
pub fn build_dispatcher(config: &RouterConfig) -> Dispatcher {
    let handlers = build_registry(config).build();
    tracing::info!(handlers = handlers.len(), "Handlers loaded");
    Dispatcher::new(handlers, config.dispatch.breaker_threshold)
}

/// Start every configured listener and run until a stop signal arrives.
pub async fn run(config: RouterConfig) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let dispatcher = Arc::new(build_dispatcher(&config));
    let shutdown = Shutdown::new();

    let admin_task = if config.admin.enabled {
        let listener = bind(&config.admin.bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Admin API listening");
        let app = setup_admin_router(dispatcher.clone());
        let mut stop = shutdown.subscribe();
        Some(tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = stop.recv().await;
                })
                .await
        }))
    } else {
        None
    };

    let listener = bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(&config, dispatcher);
    let stop = shutdown.subscribe();
    spawn_signal_listener(shutdown.clone());

    server.run(listener, stop).await?;

    if let Some(task) = admin_task {
        match task.await {
            Ok(Err(e)) => tracing::error!(error = %e, "Admin API error"),
            Err(e) => tracing::error!(error = %e, "Admin API task failed"),
            Ok(Ok(())) => {}
        }
    }
    Ok(())
}

async fn bind(address: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.to_string(),
            source,
        })
}
