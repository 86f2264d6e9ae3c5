//! Backend simulé autonome pour lancer le dashboard sans serveur réel
//!
//! Usage: ssacity-stub [ADDR]   (défaut 127.0.0.1:5000)

use anyhow::{Context, Result};
use ssacity_devkit::StubBackend;
use std::net::SocketAddr;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let addr: SocketAddr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:5000".to_string())
        .parse()
        .context("Invalid listen address")?;

    let stub = StubBackend::with_city_data();
    let running = stub.spawn(addr).await?;
    log::info!("📡 Serving SSAcity stub on {}", running.base_url());

    tokio::signal::ctrl_c().await?;
    log::info!("🛑 Shutting down stub backend");
    running.shutdown();
    Ok(())
}
