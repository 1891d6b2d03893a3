//! Metrics for operator runs.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Duration;

/// Metrics collector for one operator
#[derive(Debug, Clone)]
pub struct ConnectorMetrics {
    /// Operator name for labeling (destination key)
    connector_name: String,
    /// Intercom resource for labeling
    resource: String,
}

impl ConnectorMetrics {
    /// Create a new metrics collector
    pub fn new(connector_name: impl Into<String>, resource: impl Into<String>) -> Self {
        let connector_name = connector_name.into();
        let resource = resource.into();

        Self::register_metrics();

        Self {
            connector_name,
            resource,
        }
    }

    /// Register metric descriptions
    fn register_metrics() {
        // Counters
        describe_counter!(
            "intercom_connector_records_fetched_total",
            "Total number of records returned by the Intercom API"
        );
        describe_counter!(
            "intercom_connector_records_written_total",
            "Total number of records uploaded after filtering"
        );
        describe_counter!(
            "intercom_connector_records_skipped_total",
            "Total number of malformed records skipped in lenient mode"
        );
        describe_counter!(
            "intercom_connector_runs_failed_total",
            "Total number of failed operator runs"
        );

        // Histograms
        describe_histogram!(
            "intercom_connector_run_duration_seconds",
            "Wall time of one operator run"
        );
        describe_histogram!(
            "intercom_connector_upload_bytes",
            "Size of the uploaded NDJSON file"
        );

        // Gauges
        describe_gauge!(
            "intercom_connector_health",
            "Outcome of the last run (1 = succeeded, 0 = failed)"
        );
    }

    /// Record records returned by the API
    pub fn record_fetched(&self, count: usize) {
        counter!(
            "intercom_connector_records_fetched_total",
            "connector" => self.connector_name.clone(),
            "resource" => self.resource.clone(),
        )
        .increment(count as u64);
    }

    /// Record records uploaded
    pub fn record_written(&self, count: usize) {
        counter!(
            "intercom_connector_records_written_total",
            "connector" => self.connector_name.clone(),
            "resource" => self.resource.clone(),
        )
        .increment(count as u64);
    }

    /// Record records skipped in lenient mode
    pub fn record_skipped(&self, count: usize) {
        counter!(
            "intercom_connector_records_skipped_total",
            "connector" => self.connector_name.clone(),
            "resource" => self.resource.clone(),
        )
        .increment(count as u64);
    }

    /// Record a failed run
    pub fn record_failure(&self, error_type: &str) {
        counter!(
            "intercom_connector_runs_failed_total",
            "connector" => self.connector_name.clone(),
            "resource" => self.resource.clone(),
            "error_type" => error_type.to_string(),
        )
        .increment(1);
        self.set_health(false);
    }

    /// Record run duration
    pub fn record_run_time(&self, duration: Duration) {
        histogram!(
            "intercom_connector_run_duration_seconds",
            "connector" => self.connector_name.clone(),
            "resource" => self.resource.clone(),
        )
        .record(duration.as_secs_f64());
    }

    /// Record uploaded file size
    pub fn record_upload_bytes(&self, bytes: u64) {
        histogram!(
            "intercom_connector_upload_bytes",
            "connector" => self.connector_name.clone(),
            "resource" => self.resource.clone(),
        )
        .record(bytes as f64);
    }

    /// Set health from the last run's outcome
    pub fn set_health(&self, healthy: bool) {
        gauge!(
            "intercom_connector_health",
            "connector" => self.connector_name.clone(),
            "resource" => self.resource.clone(),
        )
        .set(if healthy { 1.0 } else { 0.0 });
    }
}

/// Timer for tracking run duration; records when dropped
pub struct RunTimer {
    start: std::time::Instant,
    metrics: ConnectorMetrics,
}

impl RunTimer {
    /// Start a timer
    pub fn start(metrics: ConnectorMetrics) -> Self {
        Self {
            start: std::time::Instant::now(),
            metrics,
        }
    }
}

impl Drop for RunTimer {
    fn drop(&mut self) {
        self.metrics.record_run_time(self.start.elapsed());
    }
}
