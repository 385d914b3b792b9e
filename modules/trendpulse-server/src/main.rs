use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use trendpulse_common::Config;
use trendpulse_server::{app, AppState};
use trendpulse_store::Store;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("trendpulse=info".parse()?))
        .init();

    info!("Trendpulse server starting...");

    let config = Config::from_env();
    config.log_redacted();

    let store = Store::connect(&config.database_url).await?;
    store.migrate().await?;

    let addr = format!("{}:{}", config.web_host, config.web_port);
    let state = AppState { config, store };
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr, "listening");

    axum::serve(listener, app(state)).await?;
    Ok(())
}
