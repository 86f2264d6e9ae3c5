//! SSAcity Dashboard binary
//!
//! Loads the config, starts the polling loop and reads commands from stdin.
//! Quits on `q` or Ctrl-C; polling outlives a closed stdin.
//! Logs go to stderr (RUST_LOG), the dashboard itself to stdout.

use anyhow::{Context, Result};
use ssacity_dashboard::runtime::{spawn_command_reader, Command, Runtime, HELP};
use ssacity_dashboard::{ApiClient, Dashboard, DashboardConfig};
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ssacity_dashboard=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    let result = runtime.block_on(run());
    // the stdin reader sits in a blocking read; don't wait for it
    runtime.shutdown_background();
    result
}

async fn run() -> Result<()> {
    info!("SSAcity Dashboard v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = DashboardConfig::load().await.context("Failed to load configuration")?;
    let client = ApiClient::new(&config.api).context("Failed to create HTTP client")?;

    let (tx, rx) = mpsc::channel(32);
    spawn_command_reader(BufReader::new(tokio::io::stdin()), tx.clone());
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = tx.send(Command::Quit).await;
        }
    });

    println!("{HELP}");
    let dashboard = Runtime::new(Dashboard::new(config), client, std::io::stdout())
        .run(rx)
        .await
        .context("Dashboard loop failed")?;

    info!("Last status: {}", dashboard.status());
    Ok(())
}
