//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dynconf_requests_total` (counter): requests by route, status
//! - `dynconf_request_duration_seconds` (histogram): latency by route
//! - `dynconf_cache_refresh_total` (counter): refreshes by outcome
//! - `dynconf_cache_refresh_duration_seconds` (histogram): rebuild time
//! - `dynconf_cache_entries` (gauge): entries in the current snapshot
//! - `dynconf_store_writes_total` (counter): upserts/deletes by outcome

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &str, status: u16, start: Instant) {
    counter!(
        "dynconf_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("dynconf_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_cache_refresh(outcome: &'static str, start: Instant) {
    counter!("dynconf_cache_refresh_total", "outcome" => outcome).increment(1);
    histogram!("dynconf_cache_refresh_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_cache_entries(entries: usize) {
    gauge!("dynconf_cache_entries").set(entries as f64);
}

pub fn record_store_write(op: &'static str, outcome: &'static str) {
    counter!("dynconf_store_writes_total", "op" => op, "outcome" => outcome).increment(1);
}
