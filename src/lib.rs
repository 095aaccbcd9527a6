//! Workspace umbrella crate for reverse-image similarity matching.
//!
//! This crate stitches the stage crates together so callers can go from a
//! YAML file to a ready [`ReverseImagePipeline`] with a single call:
//!
//! - [`perceptual`]: DCT perceptual hash and image normalization
//! - [`semantic`]: visual embedding engine
//! - [`search`]: candidate image search
//! - [`classify`]: page usage classification and explanations
//! - [`matcher`]: scoring, ranking, enrichment and the pipeline itself
//!
//! ```no_run
//! use std::path::Path;
//!
//! # async fn demo(image: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = reverse_image::load_pipeline(Some(Path::new("pipeline.yaml")))?;
//! let report = pipeline.run(&image, "hand-painted ceramic mug").await?;
//! println!("{} results, state {}", report.results.len(), report.state);
//! # Ok(())
//! # }
//! ```

pub mod config;

pub use crate::config::{
    ConfigLoadError, ReverseImageConfig, ENV_EMBEDDINGS_ENABLED, ENV_HF_TOKEN, ENV_SEARCH_API_KEY,
};

pub use classify::{
    Classification, ClassificationSource, ClassifierKind, ClassifyConfig, ContentClassifier,
    Explainer, UsageLabel,
};
pub use matcher::{
    Comparison, MatchConfig, MatchError, MatchResult, PipelineBuilder, PipelineMetrics,
    PipelineReport, PipelineState, ReverseImagePipeline, RunStats, SimilarityScores,
};
pub use perceptual::{
    hamming_distance, perceptual_similarity, ImageFingerprint, PerceptualConfig, PerceptualError,
};
pub use search::{Candidate, SearchConfig, SearchError, SearchProvider, SearchProviderKind};
pub use semantic::{
    cosine_similarity, Embedding, EmbeddingBackend, EmbeddingEngine, SemanticConfig,
    UnavailableReason,
};

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

/// Errors raised while assembling a pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigLoadError),

    #[error("search provider error: {0}")]
    Search(#[from] SearchError),

    #[error("pipeline error: {0}")]
    Match(#[from] MatchError),
}

/// Builder preloaded with every collaborator `config` describes.
///
/// Use this to swap in a custom fetcher, metrics observer or classifier
/// before building.
pub fn pipeline_builder(config: &ReverseImageConfig) -> Result<PipelineBuilder, PipelineError> {
    let search = search::build_provider(&config.search)?;
    let engine = Arc::new(EmbeddingEngine::new(config.semantic.clone()));
    let classifier = classify::build_classifier(&config.classify);

    let mut builder = ReverseImagePipeline::builder(search)
        .with_config(config.matcher.clone())
        .with_perceptual_config(config.perceptual.clone())
        .with_engine(engine)
        .with_classifier(classifier);
    if let Some(explainer) = classify::build_explainer(&config.classify) {
        builder = builder.with_explainer(explainer);
    }

    tracing::debug!(
        search = ?config.search.provider,
        embeddings = config.semantic.enabled,
        backend = config.semantic.backend.as_str(),
        classifier = ?config.classify.provider,
        "building reverse-image pipeline"
    );
    Ok(builder)
}

/// Build a pipeline from an already-loaded configuration.
///
/// The embedding backend is not loaded here; it loads on first use or on
/// [`EmbeddingEngine::initialize`].
pub fn build_pipeline(config: &ReverseImageConfig) -> Result<ReverseImagePipeline, PipelineError> {
    Ok(pipeline_builder(config)?.build()?)
}

/// Load `path` (or defaults), apply environment overrides and build.
pub fn load_pipeline(path: Option<&Path>) -> Result<ReverseImagePipeline, PipelineError> {
    let config = ReverseImageConfig::load(path)?;
    build_pipeline(&config)
}
