//! Prometheus metrics setup and metric definitions

use anyhow::Context;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_prometheus_recorder() -> anyhow::Result<PrometheusHandle> {
    // Seconds. Guard decisions are point reads, so the low end matters most.
    let buckets = vec![
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];

    PrometheusBuilder::new()
        .set_buckets(&buckets)
        .context("failed to set histogram buckets")?
        .install_recorder()
        .context("failed to install Prometheus recorder")
}

/// Register metric descriptions and emit zero values so HELP/TYPE lines are
/// present from startup, not only after first use.
pub fn describe_metrics() {
    // HTTP metrics
    describe_counter!(
        "storegate_http_requests_total",
        "Total number of HTTP requests"
    );
    describe_histogram!(
        "storegate_http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_gauge!(
        "storegate_http_requests_in_flight",
        "Number of HTTP requests currently being processed"
    );

    // Store scoping
    describe_counter!(
        "storegate_guard_decisions_total",
        "Authorization guard decisions by outcome and cause"
    );
    describe_counter!(
        "storegate_identifier_classifications_total",
        "Store identifiers classified by kind"
    );
    describe_counter!(
        "storegate_scoped_queries_total",
        "Tenant-scoped queries by table and result"
    );

    counter!("storegate_guard_decisions_total", "outcome" => "allowed", "cause" => "none")
        .absolute(0);
    counter!("storegate_guard_decisions_total", "outcome" => "denied", "cause" => "NOT_A_MEMBER")
        .absolute(0);
    for kind in ["canonical", "external", "invalid"] {
        counter!("storegate_identifier_classifications_total", "kind" => kind).absolute(0);
    }
    gauge!("storegate_http_requests_in_flight").set(0.0);
}
