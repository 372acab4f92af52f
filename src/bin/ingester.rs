use std::net::SocketAddr;

use shadow_trader::chain::{parse_account, SubtensorClient};
use shadow_trader::config::AppConfig;
use shadow_trader::db::{self, PgStore};
use shadow_trader::ingestion::{run_block_listener, Backoff, PipelineConfig};
use shadow_trader::{init_tracing, metrics, shutdown_signal};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    init_tracing(config.log_json);

    if let Some(addr) = &config.metrics_addr {
        let addr: SocketAddr = addr.parse()?;
        metrics::init_metrics_exporter(addr)?;
    }

    let coldkey = parse_account(&config.tracked_coldkey)?;

    tracing::info!("Connecting to database...");
    let pool = db::init_pool(&config.database_url, config.db_max_connections).await?;
    let store = PgStore::new(pool);
    tracing::info!("Database connected");

    tracing::info!(endpoint = %config.chain_endpoint, "Connecting to chain...");
    let chain = SubtensorClient::connect(&config.chain_endpoint).await?;
    tracing::info!("Chain connected");

    let pipeline = PipelineConfig::new(coldkey, config.match_mode);
    let backoff = Backoff::new(config.backoff_base, config.backoff_max);

    tracing::info!(
        coldkey = %config.tracked_coldkey,
        match_mode = ?config.match_mode,
        "Starting block listener"
    );
    let stats = run_block_listener(&chain, &store, &pipeline, backoff, shutdown_signal()).await;

    tracing::info!(
        processed = stats.processed,
        failed = stats.failed,
        signals_saved = stats.signals_saved,
        "Ingester stopped"
    );
    Ok(())
}
