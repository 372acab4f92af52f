use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::{Stream, StreamExt};
use subxt::backend::legacy::LegacyRpcMethods;
use subxt::backend::rpc::RpcClient;
use subxt::dynamic::Value;
use subxt::ext::scale_value::At;
use subxt::utils::{AccountId32, H256};
use subxt::{OnlineClient, SubstrateConfig};
use tokio::sync::Mutex;

use super::value::{as_u128, call_args, decode_address};
use super::{ChainClient, ChainError, ChainExtrinsic};
use crate::intelligence::{StakePosition, ROOT_NETUID};
use crate::models::{Balance, RAO_PER_TAO};

type BlockNumbers = Pin<Box<dyn Stream<Item = Result<u64, subxt::Error>> + Send>>;

/// Subtensor (Bittensor) node client over a single websocket connection.
pub struct SubtensorClient {
    api: OnlineClient<SubstrateConfig>,
    rpc: LegacyRpcMethods<SubstrateConfig>,
    best_blocks: Mutex<Option<BlockNumbers>>,
}

impl SubtensorClient {
    pub async fn connect(url: &str) -> Result<Self, ChainError> {
        let rpc_client = if url.starts_with("ws://") || url.starts_with("http://") {
            RpcClient::from_insecure_url(url).await?
        } else {
            RpcClient::from_url(url).await?
        };

        let api = OnlineClient::<SubstrateConfig>::from_rpc_client(rpc_client.clone()).await?;
        let rpc = LegacyRpcMethods::<SubstrateConfig>::new(rpc_client);

        tracing::info!(
            url = %url,
            spec_version = api.runtime_version().spec_version,
            "Connected to subtensor node"
        );

        Ok(Self {
            api,
            rpc,
            best_blocks: Mutex::new(None),
        })
    }

    async fn subscribe(&self) -> Result<BlockNumbers, ChainError> {
        let stream = self.api.blocks().subscribe_best().await?;
        tracing::debug!("Subscribed to best blocks");
        Ok(Box::pin(
            stream.map(|block| block.map(|b| u64::from(b.number()))),
        ))
    }
}

#[async_trait]
impl ChainClient for SubtensorClient {
    async fn wait_for_block(&self) -> Result<u64, ChainError> {
        let mut guard = self.best_blocks.lock().await;
        if guard.is_none() {
            *guard = Some(self.subscribe().await?);
        }
        let Some(stream) = guard.as_mut() else {
            return Err(ChainError::SubscriptionClosed);
        };

        let next = stream.next().await;
        match next {
            Some(Ok(number)) => Ok(number),
            Some(Err(e)) => {
                // Resubscribe on the next call
                *guard = None;
                Err(e.into())
            }
            None => {
                *guard = None;
                Err(ChainError::SubscriptionClosed)
            }
        }
    }

    async fn current_block(&self) -> Result<u64, ChainError> {
        let block = self.api.blocks().at_latest().await?;
        Ok(u64::from(block.number()))
    }

    async fn block_hash(&self, number: u64) -> Result<H256, ChainError> {
        self.rpc
            .chain_get_block_hash(Some(number.into()))
            .await?
            .ok_or(ChainError::MissingBlock(number))
    }

    async fn timestamp(&self, number: u64) -> Result<DateTime<Utc>, ChainError> {
        let hash = self.block_hash(number).await?;
        let addr = subxt::dynamic::storage("Timestamp", "Now", Vec::<Value>::new());
        let value = self
            .api
            .storage()
            .at(hash)
            .fetch(&addr)
            .await?
            .ok_or_else(|| ChainError::Decode(format!("no timestamp at block {number}")))?
            .to_value().map_err(subxt::Error::from)?;

        let millis = as_u128(&value)
            .and_then(|ms| i64::try_from(ms).ok())
            .ok_or_else(|| ChainError::Decode("timestamp is not an integer".into()))?;

        DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| ChainError::Decode(format!("timestamp out of range: {millis}")))
    }

    async fn block_extrinsics(&self, hash: H256) -> Result<Vec<ChainExtrinsic>, ChainError> {
        let block = self.api.blocks().at(hash).await?;
        let extrinsics = block.extrinsics().await?;

        let mut out = Vec::with_capacity(extrinsics.len());
        for ext in extrinsics.iter() {
            let ext = ext?;
            let fields = ext.field_values()?;
            out.push(ChainExtrinsic {
                address: ext.address_bytes().map(decode_address),
                call_module: ext.pallet_name()?.to_string(),
                call_function: ext.variant_name()?.to_string(),
                call_args: call_args(&fields),
            });
        }

        Ok(out)
    }

    async fn free_balance(&self, account: &AccountId32) -> Result<Balance, ChainError> {
        let addr = subxt::dynamic::storage("System", "Account", vec![Value::from_bytes(account.0)]);
        let Some(thunk) = self.api.storage().at_latest().await?.fetch(&addr).await? else {
            // Never-funded accounts have no storage entry
            return Ok(Balance::ZERO);
        };
        let info = thunk.to_value().map_err(subxt::Error::from)?;

        let free = info
            .at("data")
            .at("free")
            .and_then(as_u128)
            .ok_or_else(|| ChainError::Decode("AccountInfo without data.free".into()))?;

        u64::try_from(free)
            .map(Balance::from_rao)
            .map_err(|_| ChainError::Decode(format!("free balance out of range: {free}")))
    }

    async fn stake_for_coldkey(&self, coldkey: &AccountId32) -> Result<Vec<StakePosition>, ChainError> {
        let call = subxt::dynamic::runtime_api_call(
            "StakeInfoRuntimeApi",
            "get_stake_info_for_coldkey",
            vec![Value::from_bytes(coldkey.0)],
        );
        let result = self
            .api
            .runtime_api()
            .at_latest()
            .await?
            .call(call)
            .await?
            .to_value().map_err(subxt::Error::from)?;

        let subxt::ext::scale_value::ValueDef::Composite(entries) = &result.value else {
            return Err(ChainError::Decode("stake info is not a list".into()));
        };

        let mut positions = Vec::with_capacity(entries.len());
        for entry in entries.values() {
            let netuid = entry.at("netuid").and_then(as_u128);
            let stake = entry.at("stake").and_then(as_u128);
            match (netuid, stake) {
                (Some(netuid), Some(stake)) => positions.push(StakePosition {
                    netuid: u16::try_from(netuid)
                        .map_err(|_| ChainError::Decode(format!("netuid out of range: {netuid}")))?,
                    stake: u64::try_from(stake).unwrap_or(u64::MAX),
                }),
                _ => return Err(ChainError::Decode("stake info without netuid/stake".into())),
            }
        }

        Ok(positions)
    }

    async fn subnet_price(&self, netuid: u16) -> Result<u64, ChainError> {
        // Root stake is TAO itself
        if netuid == ROOT_NETUID {
            return Ok(RAO_PER_TAO);
        }

        let call = subxt::dynamic::runtime_api_call(
            "SwapRuntimeApi",
            "current_alpha_price",
            vec![Value::u128(u128::from(netuid))],
        );
        let price = self
            .api
            .runtime_api()
            .at_latest()
            .await?
            .call(call)
            .await?
            .to_value().map_err(subxt::Error::from)?;

        as_u128(&price)
            .and_then(|p| u64::try_from(p).ok())
            .ok_or_else(|| ChainError::Decode(format!("bad price for netuid {netuid}")))
    }
}
