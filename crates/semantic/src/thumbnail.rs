use async_trait::async_trait;
use image::imageops::FilterType;

use crate::backend::VisualEmbedder;
use crate::SemanticError;

/// Deterministic embedding built from a tiny colour thumbnail.
///
/// The image is squashed to `size x size` RGB, each channel scaled to
/// `[0, 1]`, and the per-image mean subtracted so unrelated pictures are not
/// all pushed into the same positive orthant. Used for offline deployments
/// and tests where no model is installed.
#[derive(Debug, Clone)]
pub struct ThumbnailEmbedder {
    size: u32,
}

impl ThumbnailEmbedder {
    pub fn new(size: u32) -> Self {
        Self { size: size.max(2) }
    }

    /// Output dimension: `size * size * 3`.
    pub fn dim(&self) -> usize {
        (self.size * self.size * 3) as usize
    }

    pub(crate) fn embed_sync(&self, image_bytes: &[u8]) -> Result<Vec<f32>, SemanticError> {
        let img = image::load_from_memory(image_bytes)
            .map_err(|e| SemanticError::Decode(e.to_string()))?;
        let thumb = img
            .resize_exact(self.size, self.size, FilterType::Triangle)
            .to_rgb8();

        let mut values: Vec<f32> = thumb
            .into_raw()
            .into_iter()
            .map(|b| f32::from(b) / 255.0)
            .collect();
        let mean = values.iter().sum::<f32>() / values.len() as f32;
        for v in values.iter_mut() {
            *v -= mean;
        }
        Ok(values)
    }
}

impl Default for ThumbnailEmbedder {
    fn default() -> Self {
        Self::new(16)
    }
}

#[async_trait]
impl VisualEmbedder for ThumbnailEmbedder {
    fn name(&self) -> &str {
        "thumbnail"
    }

    async fn embed(&self, image_bytes: &[u8]) -> Result<Vec<f32>, SemanticError> {
        let this = self.clone();
        let bytes = image_bytes.to_vec();
        tokio::task::spawn_blocking(move || this.embed_sync(&bytes))
            .await
            .map_err(|e| SemanticError::Inference(format!("thumbnail task failed: {e}")))?
    }
}
