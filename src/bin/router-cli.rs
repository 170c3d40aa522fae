use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "router-cli")]
#[command(about = "Maintenance CLI for the LAN router", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:8081")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check router status
    Status,
    /// List handlers in priority order
    Handlers,
    /// View per-handler counters
    Stats,
    /// List handlers disabled by the circuit breaker
    Disabled,
    /// Show which handler would serve a path
    Resolve {
        path: String,
        #[arg(long, default_value = "")]
        host: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let request = match &cli.command {
        Commands::Status => client.get(format!("{}/admin/status", base)),
        Commands::Handlers => client.get(format!("{}/admin/handlers", base)),
        Commands::Stats => client.get(format!("{}/admin/stats", base)),
        Commands::Disabled => client.get(format!("{}/admin/disabled", base)),
        Commands::Resolve { path, host } => client
            .get(format!("{}/admin/resolve", base))
            .query(&[("path", path.as_str()), ("host", host.as_str())]),
    };

    print_response(request.send().await?).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("{}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
