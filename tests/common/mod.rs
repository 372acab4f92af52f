use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use subxt::utils::{AccountId32, H256};
use tokio::sync::Notify;

use shadow_trader::chain::{CallArg, ChainClient, ChainError, ChainExtrinsic};
use shadow_trader::db::Store;
use shadow_trader::intelligence::StakePosition;
use shadow_trader::models::{Balance, NewExtrinsic, NewTick};

#[allow(dead_code)]
pub const COLDKEY: &str = "5DoAKfL58HSgynPxM1mUpyw8Fm6wS9PREZcCj4Heooq5uN4B";
#[allow(dead_code)]
pub const OTHER_KEY: &str = "5GKH9FPPnWSUoeeTJp19wVtd84XqFW4pyK2ijV2GsFbhTrP1";

/// Connect to the test database, run all migrations and clear both tables.
///
/// Returns `None` when `TEST_DATABASE_URL` is unset so database tests can
/// be skipped on machines without Postgres.
#[allow(dead_code)]
pub async fn setup_test_db() -> Option<PgPool> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping database test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    // Clean tables for test isolation
    sqlx::query("DELETE FROM extrinsics").execute(&pool).await.ok();
    sqlx::query("DELETE FROM ticks").execute(&pool).await.ok();

    Some(pool)
}

/// Where a scripted block should fail.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Balance query fails with a transient RPC error, before the tick.
    Balance,
    /// Extrinsic decoding fails, after the tick.
    Extrinsics,
}

#[derive(Debug, Clone)]
pub struct MockBlock {
    pub number: u64,
    pub timestamp: DateTime<Utc>,
    pub extrinsics: Vec<ChainExtrinsic>,
    pub failure: Option<Failure>,
}

#[allow(dead_code)]
impl MockBlock {
    pub fn new(number: u64) -> Self {
        Self {
            number,
            timestamp: DateTime::from_timestamp(1_764_000_000 + number as i64 * 12, 0)
                .expect("valid timestamp"),
            extrinsics: Vec::new(),
            failure: None,
        }
    }

    pub fn with_extrinsic(mut self, ext: ChainExtrinsic) -> Self {
        self.extrinsics.push(ext);
        self
    }

    pub fn failing(mut self, failure: Failure) -> Self {
        self.failure = Some(failure);
        self
    }
}

/// Scripted chain: yields its blocks in order, then stalls forever.
pub struct MockChain {
    blocks: Mutex<VecDeque<MockBlock>>,
    current: Mutex<Option<MockBlock>>,
    drained: Notify,
    pub free: Balance,
    pub stakes: Vec<StakePosition>,
    pub prices: HashMap<u16, u64>,
    pub price_calls: AtomicUsize,
}

#[allow(dead_code)]
impl MockChain {
    pub fn new(blocks: Vec<MockBlock>) -> Self {
        Self {
            blocks: Mutex::new(blocks.into()),
            current: Mutex::new(None),
            drained: Notify::new(),
            free: Balance::ZERO,
            stakes: Vec::new(),
            prices: HashMap::from([(0, 1_000_000_000)]),
            price_calls: AtomicUsize::new(0),
        }
    }

    /// Resolves once every scripted block has been handed out.
    pub async fn drained(&self) {
        self.drained.notified().await;
    }

    fn current(&self) -> Result<MockBlock, ChainError> {
        self.current
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ChainError::Rpc("no current block".into()))
    }

    fn check(&self, at: Failure) -> Result<(), ChainError> {
        let block = self.current()?;
        match block.failure {
            Some(f) if f == at => match f {
                Failure::Balance => Err(ChainError::Rpc("connection reset".into())),
                Failure::Extrinsics => Err(ChainError::Decode("bad extrinsic".into())),
            },
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn wait_for_block(&self) -> Result<u64, ChainError> {
        let next = self.blocks.lock().unwrap().pop_front();
        match next {
            Some(block) => {
                let number = block.number;
                *self.current.lock().unwrap() = Some(block);
                Ok(number)
            }
            None => {
                self.drained.notify_one();
                std::future::pending().await
            }
        }
    }

    async fn current_block(&self) -> Result<u64, ChainError> {
        Ok(self.current()?.number)
    }

    async fn block_hash(&self, number: u64) -> Result<H256, ChainError> {
        Ok(H256::repeat_byte((number % 256) as u8))
    }

    async fn timestamp(&self, _number: u64) -> Result<DateTime<Utc>, ChainError> {
        Ok(self.current()?.timestamp)
    }

    async fn block_extrinsics(&self, _hash: H256) -> Result<Vec<ChainExtrinsic>, ChainError> {
        self.check(Failure::Extrinsics)?;
        Ok(self.current()?.extrinsics)
    }

    async fn free_balance(&self, _account: &AccountId32) -> Result<Balance, ChainError> {
        self.check(Failure::Balance)?;
        Ok(self.free)
    }

    async fn stake_for_coldkey(&self, _coldkey: &AccountId32) -> Result<Vec<StakePosition>, ChainError> {
        Ok(self.stakes.clone())
    }

    async fn subnet_price(&self, netuid: u16) -> Result<u64, ChainError> {
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        self.prices
            .get(&netuid)
            .copied()
            .ok_or_else(|| ChainError::Decode(format!("no price for subnet {netuid}")))
    }
}

/// Store that keeps everything in memory.
#[derive(Default)]
pub struct MemoryStore {
    pub ticks: Mutex<Vec<NewTick>>,
    pub extrinsics: Mutex<Vec<NewExtrinsic>>,
    /// Block whose tick insert fails with a non-transient error.
    pub fail_tick_at: Option<i64>,
}

#[allow(dead_code)]
impl MemoryStore {
    pub fn failing_tick_at(block_number: i64) -> Self {
        Self {
            fail_tick_at: Some(block_number),
            ..Default::default()
        }
    }

    pub fn tick_blocks(&self) -> Vec<i64> {
        self.ticks.lock().unwrap().iter().map(|t| t.block_number).collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn save_tick(&self, tick: &NewTick) -> Result<(), sqlx::Error> {
        if self.fail_tick_at == Some(tick.block_number) {
            return Err(sqlx::Error::RowNotFound);
        }
        self.ticks.lock().unwrap().push(tick.clone());
        Ok(())
    }

    async fn save_extrinsic(&self, extrinsic: &NewExtrinsic) -> Result<(), sqlx::Error> {
        self.extrinsics.lock().unwrap().push(extrinsic.clone());
        Ok(())
    }
}

/// A SubtensorModule call signed by `signer`.
#[allow(dead_code)]
pub fn staking_call(signer: &str, function: &str, netuid: u16, amount: u64) -> ChainExtrinsic {
    let amount_field = if function.starts_with("remove") {
        "amount_unstaked"
    } else {
        "amount_staked"
    };
    ChainExtrinsic {
        address: Some(signer.into()),
        call_module: "SubtensorModule".into(),
        call_function: function.into(),
        call_args: vec![
            CallArg { name: "hotkey".into(), value: json!(OTHER_KEY) },
            CallArg { name: "netuid".into(), value: json!(netuid) },
            CallArg { name: amount_field.into(), value: json!(amount) },
            CallArg { name: "limit_price".into(), value: json!(9_000_000) },
            CallArg { name: "allow_partial".into(), value: json!(false) },
        ],
    }
}

/// A balance transfer signed by `signer` to `dest`.
#[allow(dead_code)]
pub fn transfer_call(signer: &str, dest: &str) -> ChainExtrinsic {
    ChainExtrinsic {
        address: Some(signer.into()),
        call_module: "Balances".into(),
        call_function: "transfer_allow_death".into(),
        call_args: vec![
            CallArg { name: "dest".into(), value: json!(dest) },
            CallArg { name: "value".into(), value: json!(1_000_000_000u64) },
        ],
    }
}

/// Serialises tests that share the database tables.
#[allow(dead_code)]
pub static DB_LOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());
