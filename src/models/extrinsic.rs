use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database row for the extrinsics table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExtrinsicRecord {
    pub id: i64,
    pub block_number: i64,
    pub timestamp: DateTime<Utc>,
    pub address: String,
    pub call_module: String,
    pub call_function: String,
    pub signal: String,
    pub hotkey: Option<String>,
    pub netuid: Option<i32>,
    pub amount_staked: Option<i64>,
    pub amount_unstaked: Option<i64>,
    pub limit_price: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// A trade-signal extrinsic ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExtrinsic {
    pub block_number: i64,
    pub timestamp: DateTime<Utc>,
    pub address: String,
    pub call_module: String,
    pub call_function: String,
    pub signal: super::TradeSignal,
    pub hotkey: Option<String>,
    pub netuid: Option<i32>,
    pub amount_staked: Option<i64>,
    pub amount_unstaked: Option<i64>,
    pub limit_price: Option<i64>,
}
