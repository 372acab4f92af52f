pub mod extrinsic_repo;
pub mod tick_repo;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::models::{NewExtrinsic, NewTick};

pub async fn init_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    run_migrations(&pool).await?;

    // Verify connectivity
    sqlx::query("SELECT 1").execute(&pool).await?;

    Ok(pool)
}

/// Create the ticks and extrinsics tables if they do not exist yet.
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Inclusive timestamp bounds for list queries. Missing bounds are open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub const UNBOUNDED: TimeWindow = TimeWindow { start: None, end: None };

    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }
}

/// Write side of the persistence layer used by the ingestion loop.
#[async_trait]
pub trait Store: Send + Sync {
    async fn save_tick(&self, tick: &NewTick) -> Result<(), sqlx::Error>;

    async fn save_extrinsic(&self, extrinsic: &NewExtrinsic) -> Result<(), sqlx::Error>;
}

/// PostgreSQL store; every save runs in its own transaction.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn save_tick(&self, tick: &NewTick) -> Result<(), sqlx::Error> {
        tick_repo::insert_tick(&self.pool, tick).await.map(|_| ())
    }

    async fn save_extrinsic(&self, extrinsic: &NewExtrinsic) -> Result<(), sqlx::Error> {
        extrinsic_repo::insert_extrinsic(&self.pool, extrinsic).await.map(|_| ())
    }
}
