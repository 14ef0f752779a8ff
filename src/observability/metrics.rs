//! Metrics collection and exposition.
//!
//! # Metrics
//! - `invoker_invocations_total` (counter): requests by function, status
//! - `invoker_invocation_duration_seconds` (histogram): latency by function
//! - `invoker_snapshot_version` (gauge): version of the current snapshot
//! - `invoker_discovery_pushes_total` (counter): pushes by resource type
//! - `invoker_discovery_nacks_total` (counter): rejections by resource type
//! - `invoker_discovery_sessions` (gauge): live subscriber sessions
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_invocation(function: &str, status: u16, start: Instant) {
    let function = function.to_string();
    counter!(
        "invoker_invocations_total",
        "function" => function.clone(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("invoker_invocation_duration_seconds", "function" => function)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_snapshot_published(version: u64) {
    gauge!("invoker_snapshot_version").set(version as f64);
}

pub fn record_discovery_push(resource: &str) {
    counter!("invoker_discovery_pushes_total", "resource" => resource.to_string()).increment(1);
}

pub fn record_discovery_nack(resource: &str) {
    counter!("invoker_discovery_nacks_total", "resource" => resource.to_string()).increment(1);
}

pub fn set_discovery_sessions(count: usize) {
    gauge!("invoker_discovery_sessions").set(count as f64);
}
