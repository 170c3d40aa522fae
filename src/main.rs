use std::path::PathBuf;

use clap::Parser;

use lan_router::config::{load_config, RouterConfig};
use lan_router::lifecycle;
use lan_router::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "lan-router")]
#[command(about = "Dispatches LAN HTTP requests to redirect and proxy handlers", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RouterConfig::default(),
    };

    init_logging(&config.observability.log_level);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        breaker_threshold = config.dispatch.breaker_threshold,
        "lan-router starting"
    );

    lifecycle::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
