//! API route handlers
//!
//! - `health`: liveness, readiness and metrics
//! - `search`: reverse-image search
//! - `images`: fingerprinting and pairwise comparison

pub mod health;
pub mod images;
pub mod search;

use crate::error::{ServerError, ServerResult};
use axum::response::IntoResponse;
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::json;

/// API version and base info
///
/// # Response
///
/// ```json
/// {
///   "name": "Reverse Image Server",
///   "version": "0.1.0",
///   "api_version": "v1",
///   "endpoints": ["..."]
/// }
/// ```
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "Reverse Image Server",
        "version": env!("CARGO_PKG_VERSION"),
        "api_version": "v1",
        "endpoints": [
            "/api/v1/reverse-search",
            "/api/v1/fingerprint",
            "/api/v1/compare",
            "/health",
            "/ready",
            "/metrics"
        ]
    })))
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}

/// Decode a base64 image field. Accepts bare base64 or a `data:` URL.
pub(crate) fn decode_image(field: &str, encoded: &str) -> ServerResult<Vec<u8>> {
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };
    let payload = payload.trim();
    if payload.is_empty() {
        return Err(ServerError::BadRequest(format!("{field} must not be empty")));
    }
    STANDARD
        .decode(payload)
        .map_err(|err| ServerError::BadRequest(format!("{field} is not valid base64: {err}")))
}
