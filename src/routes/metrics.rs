use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Prometheus metrics scrape endpoint.
pub async fn prometheus_metrics(
    axum::extract::State(handle): axum::extract::State<Arc<PrometheusHandle>>,
) -> impl IntoResponse {
    handle.render()
}

/// Register descriptions for the metrics this service records.
pub fn describe_metrics() {
    metrics::describe_counter!(
        "video_jobs_submitted_total",
        "Video creation jobs published to the job topic"
    );
    metrics::describe_counter!(
        "video_jobs_rejected_total",
        "Video creation requests rejected, by reason"
    );
    metrics::describe_counter!(
        "result_messages_total",
        "Worker result messages consumed, by outcome"
    );
    metrics::describe_counter!(
        "result_missing_total",
        "Completed jobs whose result object could not be found"
    );
    metrics::describe_gauge!(
        "correlation_entries",
        "Jobs currently tracked by the correlation store"
    );
    metrics::describe_histogram!(
        "claim_check_upload_seconds",
        "Time to upload all attachments of one request"
    );
}
