use crate::error::{ServerError, ServerResult};
use crate::routes::decode_image;
use crate::state::ServerState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use matcher::{MatchResult, PipelineState, RunStats};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Reverse-search request
#[derive(Debug, Deserialize)]
pub struct ReverseSearchRequest {
    /// Text query sent to the image search provider.
    pub query: String,
    /// Query image, base64 or a `data:` URL.
    pub image_base64: String,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub embedding_weight: Option<f32>,
    #[serde(default)]
    pub enrichment_threshold: Option<f32>,
    #[serde(default)]
    pub max_candidates: Option<usize>,
}

/// Reverse-search response
#[derive(Debug, Serialize, Deserialize)]
pub struct ReverseSearchResponse {
    pub query: String,
    pub state: PipelineState,
    pub total_results: usize,
    pub stats: RunStats,
    pub results: Vec<MatchResult>,
}

/// Run one reverse-image search.
///
/// Request fields left out fall back to the pipeline's configuration.
pub async fn reverse_search(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<ReverseSearchRequest>, JsonRejection>,
) -> ServerResult<Json<ReverseSearchResponse>> {
    let Json(request) = payload?;

    let query = request.query.trim();
    if query.is_empty() {
        return Err(ServerError::BadRequest("query must not be empty".into()));
    }
    let image = decode_image("image_base64", &request.image_base64)?;

    let mut config = state.pipeline.config().clone();
    if let Some(top_k) = request.top_k {
        config = config.with_top_k(top_k);
    }
    if let Some(weight) = request.embedding_weight {
        config = config.with_embedding_weight(weight);
    }
    if let Some(threshold) = request.enrichment_threshold {
        config = config.with_enrichment_threshold(threshold);
    }
    if let Some(max_candidates) = request.max_candidates {
        config = config.with_max_candidates(max_candidates);
    }

    let report = state.pipeline.run_with_config(&image, query, &config).await?;

    Ok(Json(ReverseSearchResponse {
        query: query.to_string(),
        state: report.state,
        total_results: report.results.len(),
        stats: report.stats,
        results: report.results,
    }))
}
