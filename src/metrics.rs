use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and register all application metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    Ok(handle)
}

/// Install the recorder behind its own HTTP listener, for processes that do
/// not run the query API.
pub fn init_metrics_exporter(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    register_metrics();
    tracing::info!(%addr, "Prometheus exporter listening");
    Ok(())
}

fn register_metrics() {
    // Pre-register counters so they appear even before the first increment.
    counter!("blocks_processed_total").absolute(0);
    counter!("block_failures_total").absolute(0);
    counter!("extrinsics_matched_total").absolute(0);
    counter!("trade_signals_saved_total").absolute(0);

    gauge!("portfolio_total_tao").set(0.0);

    // Histogram is lazily created on first record; force creation.
    histogram!("block_processing_seconds").record(0.0);
}
