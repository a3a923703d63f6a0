//! Metrics collection and exposition.
//!
//! # Metrics
//! - `nft_batch_items_total` (counter): item outcomes by operation, outcome
//! - `nft_batch_exchange_attempts_total` (counter): exchange call attempts by call, result
//! - `nft_batch_exchange_latency_seconds` (histogram): exchange call latency by call
//!
//! Recording is a no-op until a recorder is installed with [`init_metrics`].

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record the final outcome of one batch item.
pub fn record_item_outcome(operation: &'static str, outcome: &'static str) {
    metrics::counter!(
        "nft_batch_items_total",
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}

/// Record one attempt of an exchange call.
///
/// `result` is one of `ok`, `error`, `timeout`.
pub fn record_exchange_attempt(call: &'static str, result: &'static str, start_time: Instant) {
    metrics::counter!(
        "nft_batch_exchange_attempts_total",
        "call" => call,
        "result" => result
    )
    .increment(1);

    metrics::histogram!("nft_batch_exchange_latency_seconds", "call" => call)
        .record(start_time.elapsed().as_secs_f64());
}
