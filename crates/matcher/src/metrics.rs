// Metrics hooks for the reverse-image pipeline.
//
// A pipeline reports to the observer it was built with, or else to the
// process-wide one installed via [`set_pipeline_metrics`]. This keeps
// instrumentation decoupled from any specific metrics backend.
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use once_cell::sync::OnceCell;

use crate::types::{PipelineState, RunStats};

/// Why a candidate contributed nothing to a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// The hit had neither a thumbnail nor an image URL.
    NoImageUrl,
    /// Download failed or timed out.
    Fetch,
    /// The downloaded bytes were not a decodable image.
    Decode,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::NoImageUrl => "no_image_url",
            SkipReason::Fetch => "fetch",
            SkipReason::Decode => "decode",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metrics observer for pipeline runs.
pub trait PipelineMetrics: Send + Sync {
    /// Record a finished run. `state` is `Done` or `Failed`.
    fn record_run(&self, state: PipelineState, latency: Duration, stats: &RunStats);

    /// Record one dropped candidate.
    fn record_candidate_skipped(&self, reason: SkipReason);
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn PipelineMetrics>>> {
    static METRICS: OnceCell<RwLock<Option<Arc<dyn PipelineMetrics>>>> = OnceCell::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

pub(crate) fn metrics_recorder() -> Option<Arc<dyn PipelineMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

/// Install or clear the process-wide pipeline metrics recorder.
pub fn set_pipeline_metrics(recorder: Option<Arc<dyn PipelineMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}
