use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::provider::{validate_query, SearchProvider};
use crate::{Candidate, SearchConfig, SearchError};

/// SerpApi message for a query with zero hits. Not a failure.
const NO_RESULTS_MARKER: &str = "hasn't returned any results";

/// Google Images search through SerpApi.
pub struct SerpApiProvider {
    client: reqwest::Client,
    endpoint: String,
    engine: String,
    api_key: Option<String>,
    language: Option<String>,
    timeout_secs: u64,
    max_results: usize,
}

impl SerpApiProvider {
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| SearchError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            engine: config.engine.clone(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            language: config.language.clone(),
            timeout_secs: config.timeout_secs,
            max_results: config.max_results,
        })
    }
}

#[async_trait]
impl SearchProvider for SerpApiProvider {
    fn name(&self) -> &str {
        "serpapi"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Candidate>, SearchError> {
        let query = validate_query(query)?;
        let api_key = self.api_key.as_deref().ok_or(SearchError::MissingCredential)?;
        let limit = max_results.min(self.max_results);

        let mut params = vec![
            ("engine", self.engine.as_str()),
            ("q", query),
            ("api_key", api_key),
        ];
        if let Some(hl) = self.language.as_deref() {
            params.push(("hl", hl));
        }

        let started = Instant::now();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Timeout(self.timeout_secs)
                } else {
                    SearchError::Http(e.without_url().to_string())
                }
            })?;

        let status = response.status();
        let body: Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                SearchError::Timeout(self.timeout_secs)
            } else {
                SearchError::Parse(e.to_string())
            }
        })?;
        if !status.is_success() {
            let message = body
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {status}"));
            return Err(SearchError::Provider(message));
        }

        let candidates = parse_images_results(body, limit)?;
        info!(
            provider = "serpapi",
            results = candidates.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "search_completed"
        );
        Ok(candidates)
    }
}

#[derive(Debug, Deserialize)]
struct SerpImageHit {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    original: Option<String>,
    #[serde(default)]
    thumbnail: Option<String>,
}

/// Extract candidates from a SerpApi Google Images response body.
///
/// Hits with neither an original nor a thumbnail URL are skipped; the rest
/// keep provider order and are truncated to `limit`.
pub(crate) fn parse_images_results(body: Value, limit: usize) -> Result<Vec<Candidate>, SearchError> {
    let Value::Object(mut map) = body else {
        return Err(SearchError::Parse("response is not a JSON object".into()));
    };

    if let Some(Value::String(message)) = map.remove("error") {
        if message.contains(NO_RESULTS_MARKER) {
            return Ok(Vec::new());
        }
        return Err(SearchError::Provider(message));
    }

    let Some(results) = map.remove("images_results") else {
        return Ok(Vec::new());
    };
    let hits: Vec<Value> = serde_json::from_value(results)
        .map_err(|e| SearchError::Parse(format!("images_results: {e}")))?;

    let mut candidates = Vec::with_capacity(hits.len().min(limit));
    let mut skipped = 0usize;
    for raw in hits {
        if candidates.len() >= limit {
            break;
        }
        // One malformed entry should not sink the whole result page.
        let Ok(hit) = serde_json::from_value::<SerpImageHit>(raw) else {
            skipped += 1;
            continue;
        };
        let candidate = Candidate {
            title: hit.title.unwrap_or_default(),
            source: hit.source.unwrap_or_default(),
            link: hit.link.unwrap_or_default(),
            image_url: hit.original,
            thumbnail_url: hit.thumbnail,
        };
        if !candidate.has_image() {
            skipped += 1;
            continue;
        }
        candidates.push(candidate);
    }
    if skipped > 0 {
        debug!(skipped, "search_hits_skipped");
    }
    Ok(candidates)
}
