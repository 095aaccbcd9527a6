use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::{Classification, ClassifyConfig, ClassifyError};

/// Longest rationale kept, in characters.
pub const MAX_EXPLANATION_CHARS: usize = 400;

/// Produces a short free-form rationale for a prompt.
#[async_trait]
pub trait Explainer: Send + Sync {
    fn name(&self) -> &str;

    async fn explain(&self, prompt: &str) -> Result<String, ClassifyError>;
}

/// Run the explainer, degrading every failure to an empty string.
pub async fn explain_or_empty(explainer: &dyn Explainer, prompt: &str) -> String {
    match explainer.explain(prompt).await {
        Ok(text) => tidy(&text),
        Err(err) => {
            debug!(explainer = explainer.name(), error = %err, "explanation_skipped");
            String::new()
        }
    }
}

/// Build the explainer, or `None` when no endpoint is configured.
pub fn build_explainer(config: &ClassifyConfig) -> Option<Arc<dyn Explainer>> {
    let url = config.explain_url.as_deref().filter(|u| !u.trim().is_empty())?;
    match HuggingFaceExplainer::new(url, config) {
        Ok(explainer) => Some(Arc::new(explainer)),
        Err(err) => {
            debug!(error = %err, "explainer_unavailable");
            None
        }
    }
}

/// Prompt asking why a page hosting a similar image got its label.
pub fn build_explanation_prompt(
    title: &str,
    similarity: f32,
    classification: &Classification,
    snippet: &str,
) -> String {
    format!(
        "An image found on the page \"{title}\" is {:.0}% similar to a protected image. \
         The page was classified as {} (confidence {:.2}). \
         Page excerpt: {snippet}\n\
         In one or two sentences, explain whether this looks like unlicensed reuse.",
        similarity * 100.0,
        classification.label,
        classification.score,
    )
}

fn tidy(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match collapsed.char_indices().nth(MAX_EXPLANATION_CHARS) {
        Some((cut, _)) => collapsed[..cut].to_string(),
        None => collapsed,
    }
}

/// Text-generation endpoint in the Hugging Face inference format.
pub struct HuggingFaceExplainer {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
    max_new_tokens: u32,
}

impl HuggingFaceExplainer {
    pub fn new(url: &str, config: &ClassifyConfig) -> Result<Self, ClassifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| ClassifyError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.to_string(),
            token: config.api_token.clone().filter(|t| !t.trim().is_empty()),
            max_new_tokens: config.explain_max_tokens,
        })
    }
}

#[async_trait]
impl Explainer for HuggingFaceExplainer {
    fn name(&self) -> &str {
        "huggingface_text_generation"
    }

    async fn explain(&self, prompt: &str) -> Result<String, ClassifyError> {
        let payload = json!({
            "inputs": prompt,
            "parameters": {
                "max_new_tokens": self.max_new_tokens,
                "return_full_text": false,
            },
        });
        let mut request = self.client.post(&self.url).json(&payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(ClassifyError::from_reqwest)?;
        if !response.status().is_success() {
            return Err(ClassifyError::Http(format!("HTTP error {}", response.status())));
        }
        let body: Value = response.json().await.map_err(ClassifyError::from_reqwest)?;
        parse_generated_text(&body)
    }
}

/// Accepts `[{generated_text}]` and a bare `{generated_text}`.
pub(crate) fn parse_generated_text(body: &Value) -> Result<String, ClassifyError> {
    let item = match body {
        Value::Array(items) => items
            .first()
            .ok_or_else(|| ClassifyError::Parse("empty generation list".into()))?,
        other => other,
    };
    item.get("generated_text")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ClassifyError::Parse("missing `generated_text`".into()))
}
