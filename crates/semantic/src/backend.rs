use async_trait::async_trait;

use crate::SemanticError;

/// A visual feature extractor.
///
/// Implementations must be safe to share across tasks: the engine hands a
/// single loaded instance to every concurrent caller.
#[async_trait]
pub trait VisualEmbedder: Send + Sync {
    /// Short identifier used in logs and readiness reports.
    fn name(&self) -> &str;

    /// Raw (not necessarily normalized) feature vector for encoded image bytes.
    async fn embed(&self, image_bytes: &[u8]) -> Result<Vec<f32>, SemanticError>;
}
