pub mod subtensor;
pub mod value;

pub use subtensor::SubtensorClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use subxt::utils::{AccountId32, H256};

use crate::intelligence::StakePosition;
use crate::models::Balance;

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Block subscription closed")]
    SubscriptionClosed,

    #[error("Block {0} not found")]
    MissingBlock(u64),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid account: {0}")]
    InvalidAccount(String),
}

impl ChainError {
    /// Network-level failures that may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ChainError::Rpc(_) | ChainError::SubscriptionClosed | ChainError::MissingBlock(_)
        )
    }
}

/// Parse an SS58 address into an account id.
pub fn parse_account(ss58: &str) -> Result<AccountId32, ChainError> {
    ss58.trim()
        .parse()
        .map_err(|e| ChainError::InvalidAccount(format!("{ss58}: {e:?}")))
}

impl From<subxt::Error> for ChainError {
    fn from(e: subxt::Error) -> Self {
        match e {
            subxt::Error::Rpc(_) | subxt::Error::Io(_) => ChainError::Rpc(e.to_string()),
            other => ChainError::Decode(other.to_string()),
        }
    }
}

/// A named argument of an extrinsic's call, with its value rendered as JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallArg {
    pub name: String,
    pub value: serde_json::Value,
}

/// A decoded extrinsic from a block body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainExtrinsic {
    /// SS58 address of the signer; `None` for unsigned (inherent) extrinsics.
    pub address: Option<String>,
    pub call_module: String,
    pub call_function: String,
    pub call_args: Vec<CallArg>,
}

impl ChainExtrinsic {
    /// Look up a call argument by name.
    pub fn arg(&self, name: &str) -> Option<&serde_json::Value> {
        self.call_args
            .iter()
            .find(|a| a.name == name)
            .map(|a| &a.value)
    }

    pub fn arg_str(&self, name: &str) -> Option<String> {
        self.arg(name).and_then(|v| v.as_str()).map(String::from)
    }

    pub fn arg_i64(&self, name: &str) -> Option<i64> {
        self.arg(name).and_then(|v| v.as_i64())
    }

    /// The extrinsic serialized to a single JSON string.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// The chain node as seen by the ingestion loop.
///
/// Every call may fail on transient network errors; callers decide whether
/// to retry.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Suspend until the node reports a new block; returns its number.
    async fn wait_for_block(&self) -> Result<u64, ChainError>;

    async fn current_block(&self) -> Result<u64, ChainError>;

    async fn block_hash(&self, number: u64) -> Result<H256, ChainError>;

    /// Chain-reported timestamp of the block.
    async fn timestamp(&self, number: u64) -> Result<DateTime<Utc>, ChainError>;

    async fn block_extrinsics(&self, hash: H256) -> Result<Vec<ChainExtrinsic>, ChainError>;

    async fn free_balance(&self, account: &AccountId32) -> Result<Balance, ChainError>;

    async fn stake_for_coldkey(&self, coldkey: &AccountId32) -> Result<Vec<StakePosition>, ChainError>;

    /// Price of one alpha unit of `netuid`, in rao per 10^9 units.
    async fn subnet_price(&self, netuid: u16) -> Result<u64, ChainError>;
}
