use shadow_trader::api::router::create_router;
use shadow_trader::config::AppConfig;
use shadow_trader::{db, init_tracing, metrics, shutdown_signal, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    init_tracing(config.log_json);

    let metrics_handle = metrics::init_metrics()?;
    let addr = format!("{}:{}", config.host, config.port);

    tracing::info!("Connecting to database...");
    let db = db::init_pool(&config.database_url, config.db_max_connections).await?;
    tracing::info!("Database connected");

    let state = AppState {
        db,
        config,
        metrics_handle,
    };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Query API listening on {addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
