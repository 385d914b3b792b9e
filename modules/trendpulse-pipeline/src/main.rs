use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use trendpulse_common::Config;
use trendpulse_pipeline::Pipeline;
use trendpulse_store::Store;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("trendpulse=info".parse()?))
        .init();

    info!("Trendpulse pipeline starting...");

    let config = Config::from_env();
    config.log_redacted();

    let store = Store::connect(&config.database_url).await?;
    store.migrate().await?;

    let pipeline = Pipeline::live(config, store);
    let stats = pipeline.run().await?;

    info!("Pipeline run complete. {stats}");

    Ok(())
}
