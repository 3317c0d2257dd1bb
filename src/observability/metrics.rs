//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define control-plane metrics (emissions, retries, conflicts, merges)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `provider_snapshots_emitted_total` (counter): snapshots sent downstream, by provider
//! - `provider_snapshots_suppressed_total` (counter): snapshots dropped as unchanged, by provider
//! - `provider_reconnects_total` (counter): failed connects and broken streams, by provider
//! - `aggregator_conflicts_total` (counter): keys dropped by a merge, by resource kind
//! - `aggregator_merges_total` (counter): merge passes
//! - `aggregator_providers` (gauge): providers in the last merge
//! - `aggregator_resources` (gauge): resources in the last merge
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels are provider names and resource kinds only (bounded cardinality)

use std::net::SocketAddr;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

pub fn record_snapshot_emitted(provider: &str) {
    ::metrics::counter!("provider_snapshots_emitted_total", "provider" => provider.to_string())
        .increment(1);
}

pub fn record_snapshot_suppressed(provider: &str) {
    ::metrics::counter!("provider_snapshots_suppressed_total", "provider" => provider.to_string())
        .increment(1);
}

pub fn record_reconnect(provider: &str) {
    ::metrics::counter!("provider_reconnects_total", "provider" => provider.to_string())
        .increment(1);
}

pub fn record_conflict(kind: &'static str) {
    ::metrics::counter!("aggregator_conflicts_total", "kind" => kind).increment(1);
}

pub fn record_merge(providers: usize, resources: usize) {
    ::metrics::counter!("aggregator_merges_total").increment(1);
    ::metrics::gauge!("aggregator_providers").set(providers as f64);
    ::metrics::gauge!("aggregator_resources").set(resources as f64);
}
