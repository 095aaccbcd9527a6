use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::backend::VisualEmbedder;
use crate::SemanticError;

/// Remote feature-extraction backend.
///
/// The raw image bytes are POSTed as the request body (the Hugging Face
/// image feature-extraction convention) and the response is parsed as one
/// or more float arrays. Token-level outputs are mean-pooled into a single
/// vector.
pub struct ApiEmbedder {
    client: reqwest::Client,
    url: String,
    auth_header: Option<String>,
}

impl ApiEmbedder {
    pub fn new(
        url: impl Into<String>,
        token: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, SemanticError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(32)
            .build()
            .map_err(|e| SemanticError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
            auth_header: token
                .filter(|t| !t.is_empty())
                .map(|t| format!("Bearer {t}")),
        })
    }

    async fn send_request(&self, image_bytes: &[u8]) -> Result<Value, SemanticError> {
        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/octet-stream");
        if let Some(header) = self.auth_header.as_deref() {
            request = request.header("Authorization", header);
        }

        let response = request
            .body(image_bytes.to_vec())
            .send()
            .await
            .map_err(|e| SemanticError::Http(format!("HTTP request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SemanticError::Http(format!("HTTP error {status}: {body}")));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| SemanticError::Inference(format!("Invalid JSON response: {e}")))
    }
}

#[async_trait]
impl VisualEmbedder for ApiEmbedder {
    fn name(&self) -> &str {
        "api"
    }

    async fn embed(&self, image_bytes: &[u8]) -> Result<Vec<f32>, SemanticError> {
        let response = self.send_request(image_bytes).await?;
        let vectors = parse_embeddings_from_value(response)?;
        debug!(url = %self.url, vectors = vectors.len(), "api_embedding_received");
        mean_pool(vectors)
    }
}

/// Collapse several vectors (e.g. per-patch features) into one by averaging.
pub(crate) fn mean_pool(mut vectors: Vec<Vec<f32>>) -> Result<Vec<f32>, SemanticError> {
    match vectors.len() {
        0 => Err(SemanticError::Inference(
            "API response did not contain embeddings".into(),
        )),
        1 => Ok(vectors.swap_remove(0)),
        n => {
            let dim = vectors[0].len();
            if vectors.iter().any(|v| v.len() != dim) {
                return Err(SemanticError::Inference(
                    "API returned vectors of differing lengths".into(),
                ));
            }
            let mut pooled = vec![0.0f32; dim];
            for v in &vectors {
                for (acc, x) in pooled.iter_mut().zip(v) {
                    *acc += x;
                }
            }
            for acc in pooled.iter_mut() {
                *acc /= n as f32;
            }
            Ok(pooled)
        }
    }
}

pub(crate) fn parse_embeddings_from_value(value: Value) -> Result<Vec<Vec<f32>>, SemanticError> {
    match value {
        Value::Object(mut map) => {
            for key in ["embeddings", "embedding", "image_embeds"] {
                if let Some(embeddings) = map.remove(key) {
                    return parse_embedding_collection(embeddings);
                }
            }

            if let Some(Value::Array(items)) = map.remove("data") {
                let mut vectors = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Object(mut obj) => {
                            if let Some(embedding) = obj.remove("embedding") {
                                vectors.push(parse_embedding_vector(embedding)?);
                            } else {
                                return Err(SemanticError::Inference(
                                    "missing `embedding` field in data item".into(),
                                ));
                            }
                        }
                        _ => {
                            return Err(SemanticError::Inference(
                                "unexpected entry inside `data` array".into(),
                            ))
                        }
                    }
                }
                return Ok(vectors);
            }

            if let Some(Value::String(message)) = map.remove("error") {
                return Err(SemanticError::Inference(format!("API error: {message}")));
            }

            Err(SemanticError::Inference(
                "unsupported API response shape".into(),
            ))
        }
        other => parse_embedding_collection(other),
    }
}

/// Accepts a flat vector, a list of vectors, or arbitrarily nested lists of
/// vectors (`[batch][tokens][dim]`), returning every innermost vector.
fn parse_embedding_collection(value: Value) -> Result<Vec<Vec<f32>>, SemanticError> {
    match value {
        Value::Array(items) => {
            if items.is_empty() {
                Ok(Vec::new())
            } else if items.iter().all(|item| matches!(item, Value::Array(_))) {
                let mut vectors = Vec::new();
                for item in items {
                    vectors.extend(parse_embedding_collection(item)?);
                }
                Ok(vectors)
            } else {
                parse_embedding_vector(Value::Array(items)).map(|vec| vec![vec])
            }
        }
        other => parse_embedding_vector(other).map(|vec| vec![vec]),
    }
}

fn parse_embedding_vector(value: Value) -> Result<Vec<f32>, SemanticError> {
    match value {
        Value::Array(values) => values
            .into_iter()
            .map(|entry| match entry {
                Value::Number(num) => num
                    .as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| SemanticError::Inference("non-finite embedding value".into())),
                other => Err(SemanticError::Inference(format!(
                    "embedding entries must be numbers, got {other:?}"
                ))),
            })
            .collect(),
        other => Err(SemanticError::Inference(format!(
            "embedding vector must be an array, got {other:?}"
        ))),
    }
}
