// ABOUTME: Prometheus metrics for message dispatch and update routing.
// ABOUTME: Thin helpers over the metrics facade plus exporter installation.

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

pub const MESSAGES_TOTAL: &str = "courier_messages_total";
pub const UPDATES_TOTAL: &str = "courier_updates_total";
pub const ERRORS_TOTAL: &str = "courier_errors_total";
pub const TASKS_IN_FLIGHT: &str = "courier_tasks_in_flight";

/// Install the Prometheus recorder and serve it over HTTP at `listen`.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(listen: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(listen)
        .install()
        .context("Failed to install Prometheus exporter")?;

    ::metrics::describe_counter!(MESSAGES_TOTAL, "User messages dispatched, by outcome");
    ::metrics::describe_counter!(UPDATES_TOTAL, "Task updates delivered to handlers, by kind");
    ::metrics::describe_counter!(ERRORS_TOTAL, "Dispatch failures, by kind");
    ::metrics::describe_gauge!(TASKS_IN_FLIGHT, "Messages currently being processed");

    tracing::info!(%listen, "Prometheus metrics endpoint started");
    Ok(())
}

/// Record a finished dispatch ("completed" or "failed")
pub fn record_message(outcome: &'static str) {
    ::metrics::counter!(MESSAGES_TOTAL, "outcome" => outcome).increment(1);
}

/// Record an update delivered to a handler ("status" or "artifact")
pub fn record_update(kind: &'static str) {
    ::metrics::counter!(UPDATES_TOTAL, "kind" => kind).increment(1);
}

pub fn record_error(kind: &'static str) {
    ::metrics::counter!(ERRORS_TOTAL, "kind" => kind).increment(1);
}

/// Marks one message as in flight until dropped
pub struct InFlight(());

impl InFlight {
    pub fn start() -> Self {
        ::metrics::gauge!(TASKS_IN_FLIGHT).increment(1.0);
        Self(())
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        ::metrics::gauge!(TASKS_IN_FLIGHT).decrement(1.0);
    }
}
