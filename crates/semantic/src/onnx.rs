//! CLIP-style vision encoder executed with ONNX Runtime.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use tracing::{debug, info};

use crate::api::mean_pool;
use crate::backend::VisualEmbedder;
use crate::SemanticError;

/// Per-channel normalization constants used by CLIP image preprocessors.
const CLIP_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];
const CLIP_STD: [f32; 3] = [0.268_629_54, 0.261_302_6, 0.275_777_1];

/// Preferred output names, most specific first.
const OUTPUT_PREFERENCE: [&str; 2] = ["image_embeds", "pooler_output"];

#[derive(Clone)]
pub struct OnnxEmbedder {
    session: Arc<Mutex<Session>>,
    input_name: String,
    output_name: String,
    input_resolution: u32,
}

impl OnnxEmbedder {
    /// Load the vision encoder. This is the expensive step the engine runs once.
    pub fn load(model_path: &Path, input_resolution: u32) -> Result<Self, SemanticError> {
        if !model_path.exists() {
            return Err(SemanticError::ModelNotFound(
                model_path.display().to_string(),
            ));
        }

        let session = Session::builder()
            .map_err(|e| SemanticError::Inference(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| SemanticError::Inference(e.to_string()))?
            .with_intra_threads(4)
            .map_err(|e| SemanticError::Inference(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e| SemanticError::Inference(format!("failed to load vision model: {e}")))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "pixel_values".into());
        let output_name = OUTPUT_PREFERENCE
            .iter()
            .find(|wanted| session.outputs.iter().any(|o| o.name == **wanted))
            .map(|s| s.to_string())
            .or_else(|| session.outputs.first().map(|o| o.name.clone()))
            .unwrap_or_else(|| "image_embeds".into());

        info!(
            path = %model_path.display(),
            input = %input_name,
            output = %output_name,
            "onnx_vision_model_loaded"
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            output_name,
            input_resolution,
        })
    }

    fn run(&self, image_bytes: &[u8]) -> Result<Vec<f32>, SemanticError> {
        let img = image::load_from_memory(image_bytes)
            .map_err(|e| SemanticError::Decode(e.to_string()))?;
        let pixel_values = preprocess(&img, self.input_resolution);

        let input_tensor = Tensor::from_array(pixel_values)
            .map_err(|e| SemanticError::Inference(format!("failed to create input tensor: {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| SemanticError::Inference("vision session lock poisoned".into()))?;
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .map_err(|e| SemanticError::Inference(format!("vision inference failed: {e}")))?;

        let output = outputs.get(self.output_name.as_str()).ok_or_else(|| {
            SemanticError::Inference(format!("no output '{}' from vision model", self.output_name))
        })?;
        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| SemanticError::Inference(format!("failed to extract embeddings: {e}")))?;

        if data.iter().any(|v| !v.is_finite()) {
            return Err(SemanticError::Inference(
                "vision embedding contains non-finite values".into(),
            ));
        }

        // `[1, dim]` is used as is; `[1, tokens, dim]` is mean-pooled over tokens.
        let dim = shape.last().copied().unwrap_or(0).max(0) as usize;
        if dim == 0 || data.len() % dim != 0 {
            return Err(SemanticError::Inference(format!(
                "unexpected output shape {shape:?}"
            )));
        }
        let vectors: Vec<Vec<f32>> = data.chunks(dim).map(<[f32]>::to_vec).collect();
        debug!(rows = vectors.len(), dim, "onnx_embedding_extracted");
        mean_pool(vectors)
    }
}

/// Resize the shortest edge to `size`, centre-crop, and lay out as NCHW with
/// CLIP mean/std normalization.
fn preprocess(img: &DynamicImage, size: u32) -> Array4<f32> {
    let (w, h) = (img.width().max(1), img.height().max(1));
    let scale = size as f32 / w.min(h) as f32;
    let new_w = ((w as f32) * scale).round().max(size as f32) as u32;
    let new_h = ((h as f32) * scale).round().max(size as f32) as u32;
    let resized = img.resize_exact(new_w, new_h, FilterType::Triangle).to_rgb8();

    let start_x = (new_w - size) / 2;
    let start_y = (new_h - size) / 2;

    let side = size as usize;
    let mut array = Array4::<f32>::zeros((1, 3, side, side));
    for y in 0..side {
        for x in 0..side {
            let pixel = resized.get_pixel(start_x + x as u32, start_y + y as u32);
            for c in 0..3 {
                array[[0, c, y, x]] = (f32::from(pixel[c]) / 255.0 - CLIP_MEAN[c]) / CLIP_STD[c];
            }
        }
    }
    array
}

#[async_trait]
impl VisualEmbedder for OnnxEmbedder {
    fn name(&self) -> &str {
        "onnx"
    }

    async fn embed(&self, image_bytes: &[u8]) -> Result<Vec<f32>, SemanticError> {
        let this = self.clone();
        let bytes = image_bytes.to_vec();
        tokio::task::spawn_blocking(move || this.run(&bytes))
            .await
            .map_err(|e| SemanticError::Inference(format!("inference task failed: {e}")))?
    }
}
