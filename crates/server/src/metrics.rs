//! Prometheus wiring for pipeline and HTTP metrics.

use std::time::Duration;

use matcher::{PipelineMetrics, PipelineState, RunStats, SkipReason};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the process-wide Prometheus recorder.
///
/// Fails if another recorder is already installed.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// [`PipelineMetrics`] backed by the `metrics` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusPipelineMetrics;

impl PipelineMetrics for PrometheusPipelineMetrics {
    fn record_run(&self, state: PipelineState, latency: Duration, stats: &RunStats) {
        counter!("rimg_pipeline_runs_total", "state" => state.as_str()).increment(1);
        histogram!("rimg_pipeline_latency_seconds", "state" => state.as_str())
            .record(latency.as_secs_f64());
        counter!("rimg_candidates_found_total").increment(stats.candidates_found as u64);
        counter!("rimg_candidates_scored_total").increment(stats.candidates_scored as u64);
        counter!("rimg_candidates_enriched_total").increment(stats.candidates_enriched as u64);
        if state == PipelineState::Done && !stats.embedding_available {
            counter!("rimg_embedding_unavailable_runs_total").increment(1);
        }
    }

    fn record_candidate_skipped(&self, reason: SkipReason) {
        counter!("rimg_candidates_skipped_total", "reason" => reason.as_str()).increment(1);
    }
}

/// Count one finished HTTP request.
pub fn record_http_request(method: &str, status: u16, latency: Duration) {
    counter!(
        "rimg_http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("rimg_http_request_duration_seconds").record(latency.as_secs_f64());
}
