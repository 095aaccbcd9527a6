use thiserror::Error;

/// Errors raised inside embedding backends.
///
/// These never escape [`crate::EmbeddingEngine::compute_embedding`]; the
/// engine folds them into [`crate::UnavailableReason`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SemanticError {
    /// The local model file is missing.
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    /// Configuration is inconsistent for the selected backend.
    #[error("invalid semantic config: {0}")]
    InvalidConfig(String),
    /// The backend cannot be built in this binary or environment.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
    /// Transport failure talking to a remote backend.
    #[error("http error: {0}")]
    Http(String),
    /// The input bytes are not a decodable image.
    #[error("image decode failed: {0}")]
    Decode(String),
    /// ONNX Runtime failures or malformed backend output.
    #[error("inference failure: {0}")]
    Inference(String),
}
