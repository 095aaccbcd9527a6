//! YAML configuration for the reverse-image pipeline.
//!
//! One file configures every stage. Sections that are left out use the
//! stage defaults, and fields left out of a section use that field's
//! default.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "incident-matching"
//!
//! perceptual:
//!   grid_size: 32
//!   normalize_size: 256
//!
//! semantic:
//!   enabled: true
//!   backend: "onnx"
//!   model_path: "./models/clip-vit-base-patch32/onnx/vision_model.onnx"
//!
//! search:
//!   provider: "serp_api"
//!   engine: "google_images"
//!   timeout_secs: 20
//!
//! classify:
//!   provider: "hugging_face"
//!   timeout_secs: 15
//!
//! matcher:
//!   embedding_weight: 0.5
//!   top_k: 10
//!   enrichment_threshold: 0.8
//!   concurrency: 8
//!
//! env_overrides:
//!   search.api_key: "MY_SERPAPI_KEY"
//! ```
//!
//! Credentials are normally supplied through the environment rather than the
//! file: `SERPAPI_KEY`, `HF_TOKEN` and `RIMG_EMBEDDINGS_ENABLED`. The
//! `env_overrides` map renames those variables per setting.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use classify::ClassifyConfig;
use matcher::MatchConfig;
use perceptual::PerceptualConfig;
use search::SearchConfig;
use semantic::SemanticConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Variable holding the search provider key.
pub const ENV_SEARCH_API_KEY: &str = "SERPAPI_KEY";
/// Variable holding the Hugging Face token used by the classifier,
/// the explainer and the `api` embedding backend.
pub const ENV_HF_TOKEN: &str = "HF_TOKEN";
/// Variable that switches the embedding engine on or off.
pub const ENV_EMBEDDINGS_ENABLED: &str = "RIMG_EMBEDDINGS_ENABLED";

const KEY_SEARCH_API_KEY: &str = "search.api_key";
const KEY_HF_TOKEN: &str = "hf_token";
const KEY_EMBEDDINGS_ENABLED: &str = "semantic.enabled";

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level YAML configuration for the whole pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct ReverseImageConfig {
    /// Configuration format version
    pub version: String,

    /// Optional configuration name/description
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub perceptual: PerceptualConfig,

    #[serde(default)]
    pub semantic: SemanticConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub classify: ClassifyConfig,

    #[serde(default)]
    pub matcher: MatchConfig,

    /// Setting -> environment variable renames for credentials
    /// (`search.api_key`, `hf_token`, `semantic.enabled`).
    #[serde(default)]
    pub env_overrides: HashMap<String, String>,
}

impl ReverseImageConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: ReverseImageConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` (or defaults when `None`) and apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigLoadError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply credential overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_with(|name| std::env::var(name).ok());
    }

    /// Apply credential overrides from `lookup`. Values from the environment
    /// win over values from the file; empty values are ignored.
    pub fn apply_overrides_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str, default_var: &str| -> Option<String> {
            let var = self
                .env_overrides
                .get(key)
                .map(String::as_str)
                .unwrap_or(default_var);
            lookup(var)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let search_key = read(KEY_SEARCH_API_KEY, ENV_SEARCH_API_KEY);
        let hf_token = read(KEY_HF_TOKEN, ENV_HF_TOKEN);
        let embeddings = read(KEY_EMBEDDINGS_ENABLED, ENV_EMBEDDINGS_ENABLED);

        if let Some(key) = search_key {
            self.search.api_key = Some(key);
        }
        if let Some(token) = hf_token {
            self.classify.api_token = Some(token.clone());
            self.semantic.api_token = Some(token);
        }
        if let Some(flag) = embeddings {
            match parse_flag(&flag) {
                Some(enabled) => self.semantic.enabled = enabled,
                None => tracing::warn!(value = %flag, "ignoring unrecognised embeddings flag"),
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.perceptual
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("perceptual: {e}")))?;
        self.semantic
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("semantic: {e}")))?;
        self.search
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("search: {e}")))?;
        self.classify
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("classify: {e}")))?;
        self.matcher
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("matcher: {e}")))?;

        Ok(())
    }
}

impl Default for ReverseImageConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            perceptual: PerceptualConfig::default(),
            semantic: SemanticConfig::default(),
            search: SearchConfig::default(),
            classify: ClassifyConfig::default(),
            matcher: MatchConfig::default(),
            env_overrides: HashMap::new(),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
