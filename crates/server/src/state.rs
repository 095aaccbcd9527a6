use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use matcher::ReverseImagePipeline;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Pipeline shared across requests. Holds the lazily loaded embedding
    /// backend, so one instance serves the whole process.
    pub pipeline: Arc<ReverseImagePipeline>,

    /// Prometheus render handle, present when metrics are enabled.
    pub metrics: Option<PrometheusHandle>,
}

impl ServerState {
    /// Build state from the pipeline YAML named in `config`, or defaults.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let pipeline = reverse_image::load_pipeline(config.pipeline_config.as_deref())
            .map_err(|err| ServerError::Config(err.to_string()))?;

        Ok(Self::with_pipeline(config, Arc::new(pipeline)))
    }

    /// State around an already-built pipeline.
    pub fn with_pipeline(config: ServerConfig, pipeline: Arc<ReverseImagePipeline>) -> Self {
        Self {
            config: Arc::new(config),
            pipeline,
            metrics: None,
        }
    }

    pub fn with_metrics_handle(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
