//! Prometheus metrics for the audit pipeline.
//!
//! # Available Metrics
//!
//! ## Counters
//! - `audit_records_total` - Audit records written (label: status)
//! - `audit_sink_failures_total` - Records lost because the sink failed
//! - `access_denied_total` - Requests rejected outside the allowed window
//!
//! ## Histograms
//! - `audit_request_duration_seconds` - Time spent below the auditing stage
//!   (labels: method, status)
//!
//! # Usage
//!
//! ```rust,ignore
//! use audit_gate::metrics::{init_metrics, record_access_denied};
//!
//! init_metrics("0.0.0.0:9090".parse()?)?;
//! record_access_denied();
//! ```
//!
//! Recording without an installed exporter is a no-op.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{error, info};

/// Metric names as constants for consistency.
pub mod names {
    pub const AUDIT_RECORDS_TOTAL: &str = "audit_records_total";
    pub const AUDIT_SINK_FAILURES_TOTAL: &str = "audit_sink_failures_total";
    pub const ACCESS_DENIED_TOTAL: &str = "access_denied_total";
    pub const REQUEST_DURATION_SECONDS: &str = "audit_request_duration_seconds";
}

/// Install the Prometheus exporter and describe all metrics.
pub fn init_metrics(metrics_addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        names::AUDIT_RECORDS_TOTAL,
        "Total number of audit records written"
    );
    describe_counter!(
        names::AUDIT_SINK_FAILURES_TOTAL,
        "Total number of audit records that could not be written"
    );
    describe_counter!(
        names::ACCESS_DENIED_TOTAL,
        "Total number of requests rejected outside the allowed window"
    );
    describe_histogram!(
        names::REQUEST_DURATION_SECONDS,
        "Time from the auditing stage to the final response, in seconds"
    );

    info!(addr = %metrics_addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Like [`init_metrics`] but only logs on failure; metrics are optional.
pub fn try_init_metrics(metrics_addr: SocketAddr) {
    if let Err(e) = init_metrics(metrics_addr) {
        error!(error = %e, "Failed to initialize metrics, continuing without metrics");
    }
}

pub fn record_audit_written(status: u16) {
    counter!(names::AUDIT_RECORDS_TOTAL, "status" => status.to_string()).increment(1);
}

pub fn record_sink_failure() {
    counter!(names::AUDIT_SINK_FAILURES_TOTAL).increment(1);
}

pub fn record_access_denied() {
    counter!(names::ACCESS_DENIED_TOTAL).increment(1);
}

pub fn record_request_duration(method: &str, status: u16, duration_secs: f64) {
    histogram!(names::REQUEST_DURATION_SECONDS, "method" => method.to_string(), "status" => status.to_string())
        .record(duration_secs);
}

#[cfg(test)]
mod tests {
    use super::*;

    // Without an installed recorder these are no-ops; they must not panic.

    #[test]
    fn test_record_counters() {
        record_audit_written(200);
        record_sink_failure();
        record_access_denied();
    }

    #[test]
    fn test_record_request_duration() {
        record_request_duration("GET", 200, 0.01);
    }
}
