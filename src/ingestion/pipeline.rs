use std::collections::HashMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use metrics::{counter, gauge, histogram};
use rust_decimal::prelude::ToPrimitive;
use subxt::utils::AccountId32;

use crate::chain::{ChainClient, ChainError, ChainExtrinsic};
use crate::config::MatchMode;
use crate::db::Store;
use crate::errors::IngestError;
use crate::intelligence::{calculate_portfolio, classify_call};
use crate::models::{NewExtrinsic, NewTick, PortfolioBalance, TradeSignal};

/// Who to track and how to recognise their extrinsics.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub coldkey: AccountId32,
    /// SS58 form of `coldkey`, as it appears in decoded extrinsics.
    pub coldkey_ss58: String,
    pub match_mode: MatchMode,
}

impl PipelineConfig {
    pub fn new(coldkey: AccountId32, match_mode: MatchMode) -> Self {
        Self {
            coldkey_ss58: coldkey.to_string(),
            coldkey,
            match_mode,
        }
    }

    /// Whether `ext` is attributed to the tracked coldkey.
    pub fn matches(&self, ext: &ChainExtrinsic) -> Result<bool, serde_json::Error> {
        match self.match_mode {
            MatchMode::Address => Ok(ext.address.as_deref() == Some(self.coldkey_ss58.as_str())),
            MatchMode::Substring => Ok(ext.to_json_string()?.contains(&self.coldkey_ss58)),
        }
    }
}

/// What one processed block produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockOutcome {
    pub block_number: u64,
    /// Extrinsics attributed to the tracked coldkey.
    pub matched: usize,
    /// Trade-signal extrinsics persisted.
    pub saved: usize,
}

/// Process the next block:
/// 1. Wait for the node to announce a new block
/// 2. Read the current block number and its timestamp
/// 3. Compute the coldkey's portfolio and persist a tick
/// 4. Scan the block's extrinsics for the coldkey
/// 5. Persist every matched extrinsic that is a trade signal
///
/// Any error abandons the block; the tick is only written once the
/// portfolio is known, and extrinsics only after the tick.
pub async fn process_block<C, S>(
    chain: &C,
    store: &S,
    config: &PipelineConfig,
) -> Result<BlockOutcome, IngestError>
where
    C: ChainClient + ?Sized,
    S: Store + ?Sized,
{
    chain.wait_for_block().await?;
    let start = Instant::now();

    let block_number = chain.current_block().await?;
    let block = i64::try_from(block_number)
        .map_err(|_| ChainError::Decode(format!("block number out of range: {block_number}")))?;
    let timestamp = chain.timestamp(block_number).await?;
    tracing::info!(block = block_number, %timestamp, "New block");

    let balance = fetch_portfolio(chain, &config.coldkey).await?;
    tracing::info!(
        block = block_number,
        total = %balance.total,
        free = %balance.free,
        root = %balance.root,
        alpha = %balance.alpha,
        "Portfolio balance"
    );

    store
        .save_tick(&NewTick {
            block_number: block,
            timestamp,
            balance,
        })
        .await?;
    gauge!("portfolio_total_tao").set(balance.total.as_tao().to_f64().unwrap_or_default());

    let hash = chain.block_hash(block_number).await?;
    let extrinsics = chain.block_extrinsics(hash).await?;

    let mut outcome = BlockOutcome {
        block_number,
        matched: 0,
        saved: 0,
    };

    for ext in &extrinsics {
        if !config.matches(ext)? {
            continue;
        }
        outcome.matched += 1;
        counter!("extrinsics_matched_total").increment(1);

        let Some(signal) = classify_call(&ext.call_function) else {
            tracing::debug!(
                block = block_number,
                call_module = %ext.call_module,
                call_function = %ext.call_function,
                "Extrinsic is not a trade signal, skipping"
            );
            continue;
        };

        let record = build_extrinsic(block, timestamp, ext, signal);
        tracing::info!(
            block = block_number,
            signal = %signal,
            call_function = %record.call_function,
            hotkey = ?record.hotkey,
            netuid = ?record.netuid,
            "Trade signal detected"
        );

        store.save_extrinsic(&record).await?;
        outcome.saved += 1;
        counter!("trade_signals_saved_total").increment(1);
    }

    histogram!("block_processing_seconds").record(start.elapsed().as_secs_f64());
    Ok(outcome)
}

/// Free balance plus every stake position valued at its subnet price.
///
/// Each subnet price is fetched once per call, however many positions
/// share the subnet.
pub async fn fetch_portfolio<C>(chain: &C, coldkey: &AccountId32) -> Result<PortfolioBalance, ChainError>
where
    C: ChainClient + ?Sized,
{
    let free = chain.free_balance(coldkey).await?;
    let stakes = chain.stake_for_coldkey(coldkey).await?;

    let mut prices: HashMap<u16, u64> = HashMap::new();
    for position in &stakes {
        if !prices.contains_key(&position.netuid) {
            let price = chain.subnet_price(position.netuid).await?;
            prices.insert(position.netuid, price);
        }
    }

    Ok(calculate_portfolio(free, &stakes, |netuid| {
        prices.get(&netuid).copied().unwrap_or_default()
    }))
}

/// Build the row for a trade-signal extrinsic. Arguments the call does not
/// carry stay `None`, as do integers that do not fit their column.
pub fn build_extrinsic(
    block_number: i64,
    timestamp: DateTime<Utc>,
    ext: &ChainExtrinsic,
    signal: TradeSignal,
) -> NewExtrinsic {
    NewExtrinsic {
        block_number,
        timestamp,
        address: ext.address.clone().unwrap_or_default(),
        call_module: ext.call_module.clone(),
        call_function: ext.call_function.clone(),
        signal,
        hotkey: ext.arg_str("hotkey"),
        netuid: int_arg(ext, block_number, "netuid"),
        amount_staked: int_arg(ext, block_number, "amount_staked"),
        amount_unstaked: int_arg(ext, block_number, "amount_unstaked"),
        limit_price: int_arg(ext, block_number, "limit_price"),
    }
}

fn int_arg<T: TryFrom<i64>>(ext: &ChainExtrinsic, block_number: i64, name: &str) -> Option<T> {
    let raw = ext.arg(name).filter(|v| !v.is_null())?;
    let value = ext.arg_i64(name).and_then(|n| T::try_from(n).ok());
    if value.is_none() {
        tracing::warn!(
            block = block_number,
            call_function = %ext.call_function,
            arg = name,
            value = %raw,
            "Argument does not fit its column, storing NULL"
        );
    }
    value
}
