use std::fmt;

use classify::Classification;
use perceptual::{ImageFingerprint, PerceptualError};
use search::SearchError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Browser-like user agent sent with image and page fetches.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Upper bound on in-flight candidate downloads.
pub const MAX_CONCURRENCY: usize = 32;

/// Tuning knobs for one reverse-image run.
///
/// Serde-friendly so it can be embedded in pipeline YAML files and
/// overridden per HTTP request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MatchConfig {
    /// Weight of the embedding term in the combined score; clamped to `[0, 1]`.
    pub embedding_weight: f32,
    /// How many ranked candidates are considered for enrichment.
    pub top_k: usize,
    /// Combined similarity at or above which a candidate is enriched.
    pub enrichment_threshold: f32,
    /// Candidates requested from the search provider.
    pub max_candidates: usize,
    /// Candidate downloads in flight at once.
    pub concurrency: usize,
    pub image_timeout_secs: u64,
    pub page_timeout_secs: u64,
    /// Fit-inside size images are normalized to before scoring.
    pub normalize_size: u32,
    /// Page text sent to the classifier, in characters.
    pub classification_chars: usize,
    /// Page text kept in the result, in characters.
    pub snippet_chars: usize,
    pub user_agent: String,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            embedding_weight: 0.5,
            top_k: 10,
            enrichment_threshold: 0.8,
            max_candidates: 20,
            concurrency: 8,
            image_timeout_secs: 15,
            page_timeout_secs: 15,
            normalize_size: perceptual::DEFAULT_NORMALIZE_SIZE,
            classification_chars: 8000,
            snippet_chars: 500,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl MatchConfig {
    pub fn with_embedding_weight(mut self, weight: f32) -> Self {
        self.embedding_weight = weight;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_enrichment_threshold(mut self, threshold: f32) -> Self {
        self.enrichment_threshold = threshold;
        self
    }

    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = max_candidates;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// `embedding_weight` after clamping; NaN counts as 0.
    pub fn effective_weight(&self) -> f32 {
        crate::scoring::clamp_weight(self.embedding_weight)
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        if self.top_k == 0 {
            return Err(MatchError::InvalidConfig("top_k must be greater than zero".into()));
        }
        if self.max_candidates == 0 {
            return Err(MatchError::InvalidConfig(
                "max_candidates must be greater than zero".into(),
            ));
        }
        if !(1..=MAX_CONCURRENCY).contains(&self.concurrency) {
            return Err(MatchError::InvalidConfig(format!(
                "concurrency must be between 1 and {MAX_CONCURRENCY}"
            )));
        }
        if !(0.0..=1.0).contains(&self.enrichment_threshold) {
            return Err(MatchError::InvalidConfig(
                "enrichment_threshold must be between 0.0 and 1.0".into(),
            ));
        }
        if self.image_timeout_secs == 0 || self.page_timeout_secs == 0 {
            return Err(MatchError::InvalidConfig("fetch timeouts must be > 0".into()));
        }
        if self.normalize_size == 0 {
            return Err(MatchError::InvalidConfig("normalize_size must be > 0".into()));
        }
        if self.user_agent.trim().is_empty() {
            return Err(MatchError::InvalidConfig("user_agent must not be empty".into()));
        }
        Ok(())
    }
}

/// Errors that end a run.
///
/// Everything else (unreachable candidates, missing embeddings, classifier
/// outages) degrades per candidate and is visible in [`RunStats`] and in
/// absent [`MatchResult`] fields.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("invalid match config: {0}")]
    InvalidConfig(String),
    /// The query image could not be decoded or fingerprinted.
    #[error("query image is not usable: {0}")]
    InvalidQueryImage(#[source] PerceptualError),
    #[error("search unavailable: {0}")]
    SearchUnavailable(#[from] SearchError),
    /// A worker task panicked or was cancelled.
    #[error("internal pipeline failure: {0}")]
    Internal(String),
}

/// Pipeline stage.
///
/// Runs move `Searching -> Scoring -> Ranking -> Enriching -> Done`; the only
/// other edge is `Searching -> Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Searching,
    Scoring,
    Ranking,
    Enriching,
    Done,
    Failed,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Searching => "searching",
            PipelineState::Scoring => "scoring",
            PipelineState::Ranking => "ranking",
            PipelineState::Enriching => "enriching",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance_to(&self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Searching, Scoring)
                | (Searching, Failed)
                | (Scoring, Ranking)
                | (Ranking, Enriching)
                | (Enriching, Done)
        )
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-run counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Candidates returned by the search provider.
    pub candidates_found: usize,
    /// Candidates that were downloaded and scored.
    pub candidates_scored: usize,
    /// Candidates dropped as unreachable or undecodable.
    pub candidates_skipped: usize,
    /// Candidates that went through page classification.
    pub candidates_enriched: usize,
    /// Whether the query image produced an embedding.
    pub embedding_available: bool,
}

/// One entry of the final ranked list.
///
/// Enrichment fields are present only for candidates that crossed the
/// enrichment threshold within the top-k. `clip_similarity` is absent when
/// the embedding signal was not measured, which is distinct from a measured
/// zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub title: String,
    pub source: String,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Combined similarity.
    pub similarity: f32,
    pub phash_similarity: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip_similarity: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub potential_infringement: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl MatchResult {
    pub fn is_enriched(&self) -> bool {
        self.classification.is_some()
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub state: PipelineState,
    /// Every state the run entered, in order.
    pub transitions: Vec<PipelineState>,
    pub results: Vec<MatchResult>,
    pub stats: RunStats,
}

/// Direct comparison of two images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub fingerprint_a: ImageFingerprint,
    pub fingerprint_b: ImageFingerprint,
    pub hamming_distance: u32,
    pub perceptual_similarity: f32,
    pub embedding_similarity: Option<f32>,
    pub combined_similarity: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = MatchConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.embedding_weight, 0.5);
        assert_eq!(cfg.top_k, 10);
        assert_eq!(cfg.enrichment_threshold, 0.8);
        assert_eq!(cfg.concurrency, 8);
        assert_eq!(cfg.normalize_size, 256);
        assert_eq!(cfg.classification_chars, 8000);
        assert_eq!(cfg.snippet_chars, 500);
    }

    #[test]
    fn invalid_values_rejected() {
        let cases = [
            MatchConfig::default().with_top_k(0),
            MatchConfig::default().with_max_candidates(0),
            MatchConfig::default().with_concurrency(0),
            MatchConfig::default().with_concurrency(MAX_CONCURRENCY + 1),
            MatchConfig::default().with_enrichment_threshold(1.5),
            MatchConfig::default().with_enrichment_threshold(f32::NAN),
        ];
        for cfg in cases {
            match cfg.validate() {
                Err(MatchError::InvalidConfig(_)) => {}
                other => panic!("expected InvalidConfig, got {other:?}"),
            }
        }
    }

    #[test]
    fn weight_is_clamped_not_rejected() {
        let cfg = MatchConfig::default().with_embedding_weight(3.0);
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.effective_weight(), 1.0);
        assert_eq!(
            MatchConfig::default().with_embedding_weight(-1.0).effective_weight(),
            0.0
        );
    }

    #[test]
    fn state_machine_edges() {
        use PipelineState::*;
        assert!(Searching.can_advance_to(Scoring));
        assert!(Searching.can_advance_to(Failed));
        assert!(!Scoring.can_advance_to(Failed));
        assert!(!Enriching.can_advance_to(Failed));
        assert!(!Done.can_advance_to(Searching));
        assert!(Done.is_terminal() && Failed.is_terminal());
        assert_eq!(serde_json::to_string(&Enriching).unwrap(), "\"enriching\"");
    }

    #[test]
    fn match_result_uses_camel_case_and_omits_absent_fields() {
        let result = MatchResult {
            title: "Mug".into(),
            source: "Shop".into(),
            link: "https://shop.example/mug".into(),
            image_url: Some("https://shop.example/mug.png".into()),
            thumbnail_url: None,
            similarity: 0.9,
            phash_similarity: 0.9,
            clip_similarity: None,
            classification: None,
            potential_infringement: None,
            text_snippet: None,
            explanation: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("imageUrl").is_some());
        assert!(json.get("phashSimilarity").is_some());
        assert!(json.get("clipSimilarity").is_none());
        assert!(json.get("classification").is_none());
        assert!(json.get("thumbnailUrl").is_none());
        assert!(!result.is_enriched());
    }
}
