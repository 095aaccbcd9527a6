use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::api::ApiEmbedder;
use crate::backend::VisualEmbedder;
use crate::normalize::l2_normalize_in_place;
use crate::thumbnail::ThumbnailEmbedder;
use crate::{Embedding, EmbeddingBackend, SemanticConfig, SemanticError, UnavailableReason};

/// Lazily-loaded, shareable embedding engine.
///
/// The backend is loaded at most once, on the first call to
/// [`initialize`](Self::initialize) or [`compute_embedding`](Self::compute_embedding).
/// A load failure is remembered as well: the engine then reports every
/// embedding as [`UnavailableReason::BackendLoad`] instead of retrying.
pub struct EmbeddingEngine {
    config: SemanticConfig,
    backend: OnceCell<Option<Arc<dyn VisualEmbedder>>>,
}

impl std::fmt::Debug for EmbeddingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingEngine")
            .field("enabled", &self.config.enabled)
            .field("backend", &self.config.backend)
            .field("ready", &self.is_ready())
            .finish()
    }
}

impl EmbeddingEngine {
    /// Engine that will build its backend from `config` on first use.
    pub fn new(config: SemanticConfig) -> Self {
        Self {
            config,
            backend: OnceCell::new(),
        }
    }

    /// Engine that never produces vectors.
    pub fn disabled() -> Self {
        Self::new(SemanticConfig::disabled())
    }

    /// Engine around an already-constructed backend. Used to plug in custom
    /// models and in-process fakes.
    pub fn with_backend(config: SemanticConfig, backend: Arc<dyn VisualEmbedder>) -> Self {
        Self {
            config,
            backend: OnceCell::new_with(Some(Some(backend))),
        }
    }

    pub fn config(&self) -> &SemanticConfig {
        &self.config
    }

    /// Load the backend if that has not happened yet. Returns readiness.
    ///
    /// Safe to call concurrently; only one caller performs the load.
    pub async fn initialize(&self) -> bool {
        if !self.config.enabled {
            return false;
        }
        self.backend
            .get_or_init(|| async {
                let started = Instant::now();
                match load_backend(&self.config).await {
                    Ok(backend) => {
                        info!(
                            backend = backend.name(),
                            model = %self.config.model_name,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "embedding_backend_ready"
                        );
                        Some(backend)
                    }
                    Err(err) => {
                        warn!(
                            backend = self.config.backend.as_str(),
                            error = %err,
                            "embedding_backend_unavailable"
                        );
                        None
                    }
                }
            })
            .await
            .is_some()
    }

    /// Whether a backend is loaded and usable. Never triggers a load.
    pub fn is_ready(&self) -> bool {
        self.config.enabled && matches!(self.backend.get(), Some(Some(_)))
    }

    /// Name of the loaded backend, if any.
    pub fn backend_name(&self) -> Option<&str> {
        match self.backend.get() {
            Some(Some(backend)) => Some(backend.name()),
            _ => None,
        }
    }

    /// Embed encoded image bytes.
    ///
    /// Never fails: every problem is reported as [`Embedding::Unavailable`].
    pub async fn compute_embedding(&self, image_bytes: &[u8]) -> Embedding {
        if !self.config.enabled {
            return Embedding::Unavailable(UnavailableReason::Disabled);
        }
        if !self.initialize().await {
            return Embedding::Unavailable(UnavailableReason::BackendLoad);
        }
        let Some(Some(backend)) = self.backend.get() else {
            return Embedding::Unavailable(UnavailableReason::BackendLoad);
        };

        let timeout = Duration::from_secs(self.config.timeout_secs.max(1));
        let result = match tokio::time::timeout(timeout, backend.embed(image_bytes)).await {
            Ok(result) => result,
            Err(_) => Err(SemanticError::Inference(format!(
                "embedding timed out after {}s",
                timeout.as_secs()
            ))),
        };

        match result {
            Ok(mut vector) => {
                if vector.is_empty() || vector.iter().any(|v| !v.is_finite()) {
                    debug!(backend = backend.name(), "embedding_rejected_non_finite_or_empty");
                    return Embedding::Unavailable(UnavailableReason::Inference);
                }
                l2_normalize_in_place(&mut vector);
                Embedding::Vector(vector)
            }
            Err(SemanticError::Decode(msg)) => {
                debug!(backend = backend.name(), error = %msg, "embedding_decode_failed");
                Embedding::Unavailable(UnavailableReason::Decode)
            }
            Err(err) => {
                debug!(backend = backend.name(), error = %err, "embedding_inference_failed");
                Embedding::Unavailable(UnavailableReason::Inference)
            }
        }
    }
}

/// Build the backend selected by `config`.
pub async fn load_backend(config: &SemanticConfig) -> Result<Arc<dyn VisualEmbedder>, SemanticError> {
    config.validate()?;
    match config.backend {
        EmbeddingBackend::Thumbnail => Ok(Arc::new(ThumbnailEmbedder::new(config.thumbnail_size))),
        EmbeddingBackend::Api => {
            let url = config
                .api_url
                .as_deref()
                .ok_or_else(|| SemanticError::InvalidConfig("api_url is required".into()))?;
            let embedder = ApiEmbedder::new(
                url,
                config.api_token.as_deref(),
                Duration::from_secs(config.timeout_secs),
            )?;
            Ok(Arc::new(embedder))
        }
        EmbeddingBackend::Onnx => load_onnx(config).await,
    }
}

#[cfg(feature = "onnx")]
async fn load_onnx(config: &SemanticConfig) -> Result<Arc<dyn VisualEmbedder>, SemanticError> {
    let path = config.model_path.clone();
    let resolution = config.input_resolution;
    let embedder = tokio::task::spawn_blocking(move || {
        crate::onnx::OnnxEmbedder::load(&path, resolution)
    })
    .await
    .map_err(|e| SemanticError::BackendUnavailable(format!("model load task failed: {e}")))??;
    Ok(Arc::new(embedder))
}

/// Builds without ONNX Runtime serve the thumbnail backend in its place, so
/// the default configuration still produces an embedding signal.
#[cfg(not(feature = "onnx"))]
async fn load_onnx(config: &SemanticConfig) -> Result<Arc<dyn VisualEmbedder>, SemanticError> {
    warn!(
        fallback = "thumbnail",
        "onnx backend requested but built without the `onnx` feature"
    );
    Ok(Arc::new(ThumbnailEmbedder::new(config.thumbnail_size)))
}
