use sqlx::types::Json;
use sqlx::PgPool;

use super::TimeWindow;
use crate::models::{NewTick, Tick};

/// Insert a tick inside its own transaction.
///
/// The transaction rolls back when dropped uncommitted, so a failed insert
/// leaves nothing behind.
pub async fn insert_tick(pool: &PgPool, tick: &NewTick) -> Result<Tick, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, Tick>(
        r#"
        INSERT INTO ticks (block_number, timestamp, balance)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(tick.block_number)
    .bind(tick.timestamp)
    .bind(Json(&tick.balance))
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(row)
}

pub async fn count_ticks(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM ticks")
        .fetch_one(pool)
        .await?;

    Ok(row.0)
}

/// Ticks inside `window`, newest block first, optionally capped at `limit`.
pub async fn list_ticks(
    pool: &PgPool,
    window: TimeWindow,
    limit: Option<i64>,
) -> Result<Vec<Tick>, sqlx::Error> {
    sqlx::query_as::<_, Tick>(
        r#"
        SELECT * FROM ticks
        WHERE ($1::timestamptz IS NULL OR timestamp >= $1)
          AND ($2::timestamptz IS NULL OR timestamp <= $2)
        ORDER BY block_number DESC, id DESC
        LIMIT $3
        "#,
    )
    .bind(window.start)
    .bind(window.end)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// The tick with the highest block number, if any.
pub async fn latest_tick(pool: &PgPool) -> Result<Option<Tick>, sqlx::Error> {
    sqlx::query_as::<_, Tick>("SELECT * FROM ticks ORDER BY block_number DESC, id DESC LIMIT 1")
        .fetch_optional(pool)
        .await
}
