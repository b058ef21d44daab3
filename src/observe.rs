//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder (Prometheus, statsd, etc.)
//! installed by the host application collects these series. The crate only
//! increments and observes; it exposes no scrape endpoint of its own.

use std::time::Duration;

use metrics::{describe_counter, describe_histogram};

/// Total jobs that entered the processor
pub const REQUESTS_TOTAL: &str = "egress_requests_total";
/// Jobs rejected before or instead of a completed request,
/// labeled `{reason, hostname}` — the operator signal for SSRF probing
pub const BLOCKED_TOTAL: &str = "egress_blocked_total";
/// End-to-end job processing duration in seconds
pub const JOB_DURATION_SECONDS: &str = "egress_job_duration_seconds";

/// Register all metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn describe_metrics() {
    describe_counter!(REQUESTS_TOTAL, "Total egress jobs processed");
    describe_counter!(
        BLOCKED_TOTAL,
        "Egress jobs rejected by policy or validation, by reason and hostname"
    );
    describe_histogram!(
        JOB_DURATION_SECONDS,
        "End-to-end egress job processing duration in seconds"
    );
}

/// Record a job entering the processor.
pub(crate) fn record_job_received() {
    metrics::counter!(REQUESTS_TOTAL).increment(1);
}

/// Record a rejected job.
pub(crate) fn record_blocked(reason: &'static str, hostname: &str) {
    metrics::counter!(
        BLOCKED_TOTAL,
        "reason" => reason,
        "hostname" => hostname.to_string(),
    )
    .increment(1);
}

/// Record how long a job took, whatever its outcome.
pub(crate) fn record_job_duration(elapsed: Duration) {
    metrics::histogram!(JOB_DURATION_SECONDS).record(elapsed.as_secs_f64());
}
