use sqlx::PgPool;

use super::TimeWindow;
use crate::models::{ExtrinsicRecord, NewExtrinsic};

/// Insert a trade-signal extrinsic inside its own transaction.
pub async fn insert_extrinsic(
    pool: &PgPool,
    ext: &NewExtrinsic,
) -> Result<ExtrinsicRecord, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, ExtrinsicRecord>(
        r#"
        INSERT INTO extrinsics (
            block_number, timestamp, address, call_module, call_function, signal,
            hotkey, netuid, amount_staked, amount_unstaked, limit_price
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING *
        "#,
    )
    .bind(ext.block_number)
    .bind(ext.timestamp)
    .bind(&ext.address)
    .bind(&ext.call_module)
    .bind(&ext.call_function)
    .bind(ext.signal.as_str())
    .bind(&ext.hotkey)
    .bind(ext.netuid)
    .bind(ext.amount_staked)
    .bind(ext.amount_unstaked)
    .bind(ext.limit_price)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(row)
}

pub async fn count_extrinsics(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM extrinsics")
        .fetch_one(pool)
        .await?;

    Ok(row.0)
}

/// Extrinsics inside `window`, newest block first, optionally capped at `limit`.
pub async fn list_extrinsics(
    pool: &PgPool,
    window: TimeWindow,
    limit: Option<i64>,
) -> Result<Vec<ExtrinsicRecord>, sqlx::Error> {
    sqlx::query_as::<_, ExtrinsicRecord>(
        r#"
        SELECT * FROM extrinsics
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
