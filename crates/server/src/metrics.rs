//! Prometheus metrics

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder. Safe to call once per process; later
/// calls are no-ops.
pub fn init_metrics() {
    if PROMETHEUS_HANDLE.get().is_some() {
        return;
    }
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = PROMETHEUS_HANDLE.set(handle);
        }
        Err(e) => {
            tracing::warn!("Failed to install metrics recorder: {}", e);
        }
    }
}

/// Render the metrics exposition for the /metrics endpoint.
pub async fn metrics_handler() -> String {
    PROMETHEUS_HANDLE
        .get()
        .map(|h| h.render())
        .unwrap_or_default()
}

pub fn record_lead_processed(status: &'static str) {
    metrics::counter!("fixline_leads_processed_total", "status" => status).increment(1);
}

pub fn record_call_started() {
    metrics::counter!("fixline_calls_started_total").increment(1);
}

pub fn record_call_completed(status: &'static str) {
    metrics::counter!("fixline_calls_completed_total", "status" => status).increment(1);
}

pub fn set_active_sessions(count: usize) {
    metrics::gauge!("fixline_active_sessions").set(count as f64);
}
