use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::SemanticError;

/// Which visual feature extractor backs the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Local CLIP-style vision encoder (requires the `onnx` cargo feature).
    #[default]
    Onnx,
    /// Remote feature-extraction endpoint that accepts raw image bytes.
    Api,
    /// Deterministic pixel embedding. No model, always available.
    Thumbnail,
}

impl EmbeddingBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingBackend::Onnx => "onnx",
            EmbeddingBackend::Api => "api",
            EmbeddingBackend::Thumbnail => "thumbnail",
        }
    }
}

/// Runtime configuration describing which visual backend to load and how to
/// post-process its vectors.
///
/// # Example
/// ```no_run
/// use semantic::{EmbeddingBackend, EmbeddingEngine, SemanticConfig};
///
/// # async fn run(image: &[u8]) {
/// let cfg = SemanticConfig::default()
///     .with_backend(EmbeddingBackend::Api)
///     .with_api_url("https://router.huggingface.co/hf-inference/models/openai/clip-vit-base-patch32")
///     .with_api_token("hf_xxx");
///
/// let engine = EmbeddingEngine::new(cfg);
/// let embedding = engine.compute_embedding(image).await;
/// println!("available: {}", embedding.is_available());
/// # }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SemanticConfig {
    /// Master switch. When `false` every embedding is reported as unavailable.
    pub enabled: bool,
    /// Backend selector.
    pub backend: EmbeddingBackend,
    /// Friendly label surfaced in logs and readiness reports.
    pub model_name: String,
    /// Local vision encoder for the `onnx` backend.
    pub model_path: PathBuf,
    /// Square input resolution expected by the vision encoder.
    pub input_resolution: u32,
    /// Endpoint for the `api` backend.
    pub api_url: Option<String>,
    /// Bearer token sent to the `api` backend.
    pub api_token: Option<String>,
    /// Per-call timeout in seconds, applied to every backend.
    pub timeout_secs: u64,
    /// Side length of the grid sampled by the `thumbnail` backend.
    pub thumbnail_size: u32,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: EmbeddingBackend::Onnx,
            model_name: "clip-vit-base-patch32".into(),
            model_path: PathBuf::from("./models/clip-vit-base-patch32/onnx/vision_model.onnx"),
            input_resolution: 224,
            api_url: None,
            api_token: None,
            timeout_secs: 30,
            thumbnail_size: 16,
        }
    }
}

impl SemanticConfig {
    /// Configuration with embeddings switched off entirely.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_backend(mut self, backend: EmbeddingBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = path.into();
        self
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Validate the fields the selected backend depends on.
    ///
    /// A disabled configuration is always valid.
    pub fn validate(&self) -> Result<(), SemanticError> {
        if !self.enabled {
            return Ok(());
        }
        if self.timeout_secs == 0 {
            return Err(SemanticError::InvalidConfig(
                "timeout_secs must be > 0".into(),
            ));
        }
        match self.backend {
            EmbeddingBackend::Onnx if self.input_resolution == 0 => Err(
                SemanticError::InvalidConfig("input_resolution must be > 0".into()),
            ),
            EmbeddingBackend::Api if self.api_url.as_deref().is_none_or(str::is_empty) => Err(
                SemanticError::InvalidConfig("api_url is required for the api backend".into()),
            ),
            EmbeddingBackend::Thumbnail if self.thumbnail_size < 2 => Err(
                SemanticError::InvalidConfig("thumbnail_size must be >= 2".into()),
            ),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_values() {
        let cfg = SemanticConfig::default();
        assert!(cfg.enabled);
        assert_eq!(cfg.backend, EmbeddingBackend::Onnx);
        assert_eq!(cfg.input_resolution, 224);
        assert_eq!(cfg.timeout_secs, 30);
        assert!(cfg.api_url.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn disabled_config_skips_validation() {
        let cfg = SemanticConfig {
            timeout_secs: 0,
            ..SemanticConfig::disabled()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn api_backend_requires_url() {
        let cfg = SemanticConfig::default().with_backend(EmbeddingBackend::Api);
        assert!(matches!(
            cfg.validate(),
            Err(SemanticError::InvalidConfig(msg)) if msg.contains("api_url")
        ));

        let cfg = cfg.with_api_url("http://localhost:9000/embed");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn thumbnail_backend_rejects_degenerate_grid() {
        let cfg = SemanticConfig {
            thumbnail_size: 1,
            ..SemanticConfig::default().with_backend(EmbeddingBackend::Thumbnail)
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn backend_names_roundtrip_through_serde() {
        for backend in [
            EmbeddingBackend::Onnx,
            EmbeddingBackend::Api,
            EmbeddingBackend::Thumbnail,
        ] {
            let json = serde_json::to_string(&backend).unwrap();
            assert_eq!(json, format!("\"{}\"", backend.as_str()));
            let back: EmbeddingBackend = serde_json::from_str(&json).unwrap();
            assert_eq!(back, backend);
        }
    }

    #[test]
    fn partial_config_fills_defaults() {
        let cfg: SemanticConfig =
            serde_json::from_str(r#"{"backend": "thumbnail", "enabled": false}"#).unwrap();
        assert_eq!(cfg.backend, EmbeddingBackend::Thumbnail);
        assert!(!cfg.enabled);
        assert_eq!(cfg.thumbnail_size, 16);
    }
}
