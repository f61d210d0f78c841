use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    describe();
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

fn describe() {
    metrics::describe_counter!("http_requests_total", "HTTP responses by status code");
    metrics::describe_histogram!("http_request_duration_seconds", "HTTP request latency");
    metrics::describe_counter!("grading_jobs_total", "Grading jobs by outcome");
    metrics::describe_histogram!("grading_duration_seconds", "Grading engine latency");
    metrics::describe_histogram!("grading_queue_latency_seconds", "Time a job waits for a worker");
    metrics::describe_gauge!("grading_queue_depth", "Jobs waiting for a grading worker");
    metrics::describe_counter!("students_imported_total", "Students added through roster import");
    metrics::describe_counter!("assignment_transitions_total", "Assignment lifecycle transitions");
}
