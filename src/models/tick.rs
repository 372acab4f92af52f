use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use super::PortfolioBalance;

/// Database row for the ticks table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tick {
    pub id: i64,
    pub block_number: i64,
    pub timestamp: DateTime<Utc>,
    pub balance: Json<PortfolioBalance>,
    pub created_at: DateTime<Utc>,
}

/// A tick ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTick {
    pub block_number: i64,
    pub timestamp: DateTime<Utc>,
    pub balance: PortfolioBalance,
}
