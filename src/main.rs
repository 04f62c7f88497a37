mod classifier;
mod config;
mod content_extractor;
mod fetch_proxy;
mod integrator;
mod observability;
mod pipeline;
mod server;
mod signals;
mod url_analyzer;

use crate::config::ScannerConfig;
use crate::server::ApiServer;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = ScannerConfig::from_env();
    if config.classifier.is_none() {
        info!("no classifier configured; scans run heuristic-only");
    }
    info!(
        addr = config.bind_addr.as_str(),
        sensitivity = config.sensitivity.name,
        "starting site-trust-scanner"
    );

    let server = ApiServer::bind(&config).await?;
    server.serve().await?;
    Ok(())
}
