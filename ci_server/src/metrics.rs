//! Prometheus metrics for sync observability.

use metrics::{counter, histogram};

/// Initialize metrics exporter (Prometheus).
pub fn init_metrics() {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    if let Err(e) = builder.install() {
        tracing::warn!("Failed to install Prometheus exporter: {}", e);
    }
}

/// Record a finished sweep.
pub fn sweep_completed(trigger: &str, duration_ms: u64) {
    counter!("cicd_sweeps_total", "trigger" => trigger.to_string()).increment(1);
    histogram!("cicd_sweep_duration_ms").record(duration_ms as f64);
}

/// Record builds inserted by one repository sync.
pub fn builds_synced(count: usize) {
    counter!("cicd_builds_synced_total").increment(count as u64);
}

/// Record the outcome of one repository sync within a sweep.
pub fn repository_synced(outcome: &str) {
    counter!("cicd_repository_syncs_total", "outcome" => outcome.to_string()).increment(1);
}

/// Record a sync failure by kind.
pub fn sync_failed(kind: &str) {
    counter!("cicd_sync_failures_total", "kind" => kind.to_string()).increment(1);
}

/// Record a GitHub API response (or "error" when none arrived).
pub fn github_request(status: &str) {
    counter!("cicd_github_requests_total", "status" => status.to_string()).increment(1);
}
