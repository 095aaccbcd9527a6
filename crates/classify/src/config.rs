use serde::{Deserialize, Serialize};

use crate::ClassifyError;

fn default_api_url() -> String {
    "https://api-inference.huggingface.co/models/facebook/bart-large-mnli".into()
}

fn default_candidate_labels() -> Vec<String> {
    vec!["Commercial".into(), "Educational".into(), "Safe".into()]
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_explain_max_tokens() -> u32 {
    80
}

/// Which classifier backs the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    /// Hosted zero-shot NLI model.
    #[default]
    HuggingFace,
    /// Offline keyword heuristic.
    Keyword,
    /// No classifier: every call falls back.
    Disabled,
}

/// Classification and explanation configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassifyConfig {
    #[serde(default)]
    pub provider: ClassifierKind,
    /// Zero-shot classification endpoint.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Bearer token for the hosted endpoints. Unset means "not configured".
    #[serde(default)]
    pub api_token: Option<String>,
    /// Labels offered to the zero-shot model.
    #[serde(default = "default_candidate_labels")]
    pub candidate_labels: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Optional text-generation endpoint for short rationales.
    #[serde(default)]
    pub explain_url: Option<String>,
    #[serde(default = "default_explain_max_tokens")]
    pub explain_max_tokens: u32,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            provider: ClassifierKind::HuggingFace,
            api_url: default_api_url(),
            api_token: None,
            candidate_labels: default_candidate_labels(),
            timeout_secs: default_timeout_secs(),
            explain_url: None,
            explain_max_tokens: default_explain_max_tokens(),
        }
    }
}

impl ClassifyConfig {
    pub fn with_provider(mut self, provider: ClassifierKind) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn with_explain_url(mut self, url: impl Into<String>) -> Self {
        self.explain_url = Some(url.into());
        self
    }

    pub fn validate(&self) -> Result<(), ClassifyError> {
        if self.timeout_secs == 0 {
            return Err(ClassifyError::InvalidConfig("timeout_secs must be > 0".into()));
        }
        if self.provider == ClassifierKind::HuggingFace {
            if self.api_url.trim().is_empty() {
                return Err(ClassifyError::InvalidConfig("api_url must not be empty".into()));
            }
            if self.candidate_labels.is_empty() {
                return Err(ClassifyError::InvalidConfig(
                    "candidate_labels must not be empty".into(),
                ));
            }
        }
        Ok(())
    }
}
