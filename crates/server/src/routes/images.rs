use crate::error::ServerResult;
use crate::routes::decode_image;
use crate::state::ServerState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use matcher::Comparison;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct FingerprintRequest {
    pub image_base64: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FingerprintResponse {
    /// 16 lowercase hex characters.
    pub fingerprint: String,
    pub grid_size: u32,
    pub normalize_size: u32,
}

/// Fingerprint one image the way query and candidate images are fingerprinted.
pub async fn fingerprint_image(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<FingerprintRequest>, JsonRejection>,
) -> ServerResult<Json<FingerprintResponse>> {
    let Json(request) = payload?;
    let image = decode_image("image_base64", &request.image_base64)?;
    let fingerprint = state.pipeline.fingerprint(&image).await?;

    Ok(Json(FingerprintResponse {
        fingerprint: fingerprint.hash().to_string(),
        grid_size: fingerprint.grid_size(),
        normalize_size: state.pipeline.config().normalize_size,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    pub image_a: String,
    pub image_b: String,
    #[serde(default)]
    pub embedding_weight: Option<f32>,
}

/// Score two images against each other.
pub async fn compare_images(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<CompareRequest>, JsonRejection>,
) -> ServerResult<Json<Comparison>> {
    let Json(request) = payload?;
    let image_a = decode_image("image_a", &request.image_a)?;
    let image_b = decode_image("image_b", &request.image_b)?;

    let comparison = state
        .pipeline
        .compare(&image_a, &image_b, request.embedding_weight)
        .await?;
    Ok(Json(comparison))
}
