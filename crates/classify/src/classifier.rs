use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::{Classification, ClassifierKind, ClassifyConfig, ClassifyError, UsageLabel};

/// Classifies page text into a [`UsageLabel`].
#[async_trait]
pub trait ContentClassifier: Send + Sync {
    fn name(&self) -> &str;

    async fn classify(&self, text: &str) -> Result<Classification, ClassifyError>;
}

/// Classify `text`, returning [`Classification::fallback`] on any failure.
///
/// Empty or whitespace-only text is not sent to the classifier at all.
pub async fn classify_or_fallback(classifier: &dyn ContentClassifier, text: &str) -> Classification {
    if text.trim().is_empty() {
        return Classification::fallback();
    }
    match classifier.classify(text).await {
        Ok(classification) => classification,
        Err(err) => {
            debug!(classifier = classifier.name(), error = %err, "classification_fallback");
            Classification::fallback()
        }
    }
}

/// Build the classifier selected by `config`.
///
/// Configuration problems never fail the caller: they produce a classifier
/// that always reports itself unavailable, so the pipeline falls back.
pub fn build_classifier(config: &ClassifyConfig) -> Arc<dyn ContentClassifier> {
    if let Err(err) = config.validate() {
        warn!(error = %err, "classifier_config_invalid");
        return Arc::new(DisabledClassifier::new(err.to_string()));
    }
    match config.provider {
        ClassifierKind::HuggingFace => match HuggingFaceZeroShot::new(config) {
            Ok(classifier) => Arc::new(classifier),
            Err(err) => {
                warn!(error = %err, "classifier_unavailable");
                Arc::new(DisabledClassifier::new(err.to_string()))
            }
        },
        ClassifierKind::Keyword => Arc::new(KeywordClassifier),
        ClassifierKind::Disabled => Arc::new(DisabledClassifier::new("disabled by config")),
    }
}

/// Always unavailable.
#[derive(Debug, Clone)]
pub struct DisabledClassifier {
    reason: String,
}

impl DisabledClassifier {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl ContentClassifier for DisabledClassifier {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn classify(&self, _text: &str) -> Result<Classification, ClassifyError> {
        Err(ClassifyError::NotConfigured(self.reason.clone()))
    }
}

/// Zero-shot NLI classification through the Hugging Face inference API.
pub struct HuggingFaceZeroShot {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
    candidate_labels: Vec<String>,
}

impl HuggingFaceZeroShot {
    pub fn new(config: &ClassifyConfig) -> Result<Self, ClassifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ClassifyError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: config.api_url.clone(),
            token: config.api_token.clone().filter(|t| !t.trim().is_empty()),
            candidate_labels: config.candidate_labels.clone(),
        })
    }
}

#[async_trait]
impl ContentClassifier for HuggingFaceZeroShot {
    fn name(&self) -> &str {
        "huggingface_zero_shot"
    }

    async fn classify(&self, text: &str) -> Result<Classification, ClassifyError> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| ClassifyError::NotConfigured("api_token is not set".into()))?;

        let payload = json!({
            "inputs": text,
            "parameters": { "candidate_labels": self.candidate_labels },
        });

        let started = Instant::now();
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await
            .map_err(ClassifyError::from_reqwest)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifyError::Http(format!("HTTP error {status}: {body}")));
        }

        let body: Value = response.json().await.map_err(ClassifyError::from_reqwest)?;
        let scored = parse_zero_shot(body)?;
        let classification = top_classification(&scored)?;
        debug!(
            label = %classification.label,
            score = classification.score,
            latency_ms = started.elapsed().as_millis() as u64,
            "zero_shot_classified"
        );
        Ok(classification)
    }
}

/// Normalize the zero-shot response shapes into `(label, score)` pairs.
///
/// Accepts `{labels, scores}`, a one-element list of that object, and the
/// router's `[{label, score}, ...]` list.
pub(crate) fn parse_zero_shot(body: Value) -> Result<Vec<(String, f32)>, ClassifyError> {
    match body {
        Value::Object(mut map) => {
            if let Some(Value::String(message)) = map.remove("error") {
                return Err(ClassifyError::Http(message));
            }
            let labels = map
                .remove("labels")
                .ok_or_else(|| ClassifyError::Parse("missing `labels`".into()))?;
            let scores = map
                .remove("scores")
                .ok_or_else(|| ClassifyError::Parse("missing `scores`".into()))?;
            let labels: Vec<String> = serde_json::from_value(labels)
                .map_err(|e| ClassifyError::Parse(format!("labels: {e}")))?;
            let scores: Vec<f32> = serde_json::from_value(scores)
                .map_err(|e| ClassifyError::Parse(format!("scores: {e}")))?;
            if labels.len() != scores.len() {
                return Err(ClassifyError::Parse(
                    "labels and scores differ in length".into(),
                ));
            }
            Ok(labels.into_iter().zip(scores).collect())
        }
        Value::Array(mut items) => {
            if items.len() == 1 && items[0].get("labels").is_some() {
                return parse_zero_shot(items.swap_remove(0));
            }
            items
                .into_iter()
                .map(|item| {
                    let label = item
                        .get("label")
                        .and_then(Value::as_str)
                        .ok_or_else(|| ClassifyError::Parse("missing `label`".into()))?;
                    let score = item
                        .get("score")
                        .and_then(Value::as_f64)
                        .ok_or_else(|| ClassifyError::Parse("missing `score`".into()))?;
                    Ok((label.to_string(), score as f32))
                })
                .collect()
        }
        other => Err(ClassifyError::Parse(format!(
            "unsupported response shape: {other}"
        ))),
    }
}

fn top_classification(scored: &[(String, f32)]) -> Result<Classification, ClassifyError> {
    let (label, score) = scored
        .iter()
        .filter(|(_, s)| s.is_finite())
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .ok_or_else(|| ClassifyError::Parse("no scored labels".into()))?;
    Ok(Classification::new(UsageLabel::from_provider_label(label), *score))
}

const COMMERCIAL_CUES: &[&str] = &[
    "add to cart",
    "buy now",
    "buy ",
    "price",
    "checkout",
    "free shipping",
    "in stock",
    "order now",
    "shop",
    "sale",
    "$",
    "€",
    "£",
];

const EDUCATIONAL_CUES: &[&str] = &[
    "course",
    "lesson",
    "tutorial",
    "lecture",
    "university",
    "school",
    "education",
    "research",
    "learn",
    "syllabus",
];

/// Offline heuristic that counts shopping and teaching vocabulary.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn classify_text(&self, text: &str) -> Classification {
        let lower = text.to_lowercase();
        let count = |cues: &[&str]| -> usize { cues.iter().map(|c| lower.matches(c).count()).sum() };
        let commercial = count(COMMERCIAL_CUES);
        let educational = count(EDUCATIONAL_CUES);

        if commercial == 0 && educational == 0 {
            return Classification::new(UsageLabel::Safe, 0.6);
        }
        let (label, hits) = if commercial >= educational {
            (UsageLabel::Commercial, commercial)
        } else {
            (UsageLabel::Educational, educational)
        };
        let share = hits as f32 / (commercial + educational) as f32;
        let strength = hits as f32 / (hits as f32 + 1.0);
        Classification::new(label, share * strength)
    }
}

#[async_trait]
impl ContentClassifier for KeywordClassifier {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn classify(&self, text: &str) -> Result<Classification, ClassifyError> {
        Ok(self.classify_text(text))
    }
}
