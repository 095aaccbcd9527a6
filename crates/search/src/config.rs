use serde::{Deserialize, Serialize};

use crate::{Candidate, SearchError};

fn default_endpoint() -> String {
    "https://serpapi.com/search.json".into()
}

fn default_engine() -> String {
    "google_images".into()
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_max_results() -> usize {
    20
}

/// Which provider answers candidate searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearchProviderKind {
    #[default]
    SerpApi,
    /// Fixed candidate list from [`SearchConfig::static_results`].
    Static,
}

/// Candidate search configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchConfig {
    #[serde(default)]
    pub provider: SearchProviderKind,
    /// Provider credential. Searches fail with a missing-credential error when unset.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Provider-side engine name.
    #[serde(default = "default_engine")]
    pub engine: String,
    /// Optional interface language hint (`hl`).
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Upper bound applied when the caller asks for more.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default)]
    pub static_results: Vec<Candidate>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: SearchProviderKind::SerpApi,
            api_key: None,
            endpoint: default_endpoint(),
            engine: default_engine(),
            language: None,
            timeout_secs: default_timeout_secs(),
            max_results: default_max_results(),
            static_results: Vec::new(),
        }
    }
}

impl SearchConfig {
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_static_results(mut self, results: Vec<Candidate>) -> Self {
        self.provider = SearchProviderKind::Static;
        self.static_results = results;
        self
    }

    pub fn validate(&self) -> Result<(), SearchError> {
        if self.timeout_secs == 0 {
            return Err(SearchError::InvalidConfig("timeout_secs must be > 0".into()));
        }
        if self.max_results == 0 {
            return Err(SearchError::InvalidConfig("max_results must be > 0".into()));
        }
        if self.provider == SearchProviderKind::SerpApi && self.endpoint.trim().is_empty() {
            return Err(SearchError::InvalidConfig("endpoint must not be empty".into()));
        }
        Ok(())
    }
}
