use std::future::Future;
use std::time::Duration;

use metrics::counter;
use tokio::time::sleep;

use super::pipeline::{process_block, PipelineConfig};
use crate::chain::ChainClient;
use crate::db::Store;

/// Capped exponential backoff for transient ingestion failures.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    attempt: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            attempt: 0,
        }
    }

    /// Delay before the next attempt; doubles on every call up to `max`.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self
            .base
            .saturating_mul(2u32.saturating_pow(self.attempt))
            .min(self.max);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

/// Counts kept by the listener over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    pub processed: u64,
    pub failed: u64,
    pub signals_saved: u64,
}

/// Run the ingestion loop until `shutdown` resolves.
///
/// A failed block is logged and skipped, never retried. Transient failures
/// (node or database unreachable) back off before waiting for the next
/// block; other failures continue immediately. The backoff resets after the
/// first successful block.
pub async fn run_block_listener<C, S, F>(
    chain: &C,
    store: &S,
    config: &PipelineConfig,
    mut backoff: Backoff,
    shutdown: F,
) -> ListenerStats
where
    C: ChainClient + ?Sized,
    S: Store + ?Sized,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut stats = ListenerStats::default();

    tracing::info!(
        coldkey = %config.coldkey_ss58,
        match_mode = ?config.match_mode,
        "Block listener started"
    );

    loop {
        let result = tokio::select! {
            _ = &mut shutdown => break,
            result = process_block(chain, store, config) => result,
        };

        match result {
            Ok(outcome) => {
                stats.processed += 1;
                stats.signals_saved += outcome.saved as u64;
                counter!("blocks_processed_total").increment(1);
                backoff.reset();

                tracing::debug!(
                    block = outcome.block_number,
                    matched = outcome.matched,
                    saved = outcome.saved,
                    "Block processed"
                );
            }
            Err(e) => {
                stats.failed += 1;
                counter!("block_failures_total").increment(1);

                if e.is_transient() {
                    let delay = backoff.next_delay();
                    tracing::warn!(
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        attempt = backoff.attempt(),
                        "Block processing failed, backing off"
                    );
                    tokio::select! {
                        _ = &mut shutdown => break,
                        _ = sleep(delay) => {}
                    }
                } else {
                    tracing::error!(error = %e, "Block processing failed, skipping block");
                }
            }
        }
    }

    tracing::info!(
        processed = stats.processed,
        failed = stats.failed,
        signals_saved = stats.signals_saved,
        "Block listener stopped"
    );
    stats
}
