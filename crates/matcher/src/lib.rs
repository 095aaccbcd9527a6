//! # Reverse-Image Matcher (`matcher`)
//!
//! ## Purpose
//!
//! `matcher` sits on top of the stage crates (`perceptual`, `semantic`,
//! `search`, `classify`) and turns a query image plus a text query into a
//! ranked, annotated list of web images that look like it.
//!
//! A run moves through `Searching -> Scoring -> Ranking -> Enriching -> Done`:
//!
//! 1. **Searching**: ask the [`search::SearchProvider`] for candidates. A
//!    search failure is the only way a run with a valid query image fails.
//! 2. **Scoring**: download each candidate (thumbnail first), normalize it to
//!    256x256 fit-inside, fingerprint and embed it, and [`combine`] the scores
//!    against the query. Unreachable candidates are skipped.
//! 3. **Ranking**: stable sort by combined similarity.
//! 4. **Enriching**: for the top-k candidates at or above the enrichment
//!    threshold, fetch the hosting page, extract its text, classify it and
//!    flag `Commercial` pages as likely infringing.
//!
//! ## Core Types
//!
//! - [`ReverseImagePipeline`] / [`PipelineBuilder`]: the orchestrator and its
//!   collaborators.
//! - [`MatchConfig`]: weight, top-k, threshold, concurrency and fetch limits.
//! - [`MatchResult`]: one serialized entry of the final list (camelCase).
//! - [`PipelineReport`]: results plus final state, transitions and [`RunStats`].
//! - [`Fetcher`]: HTTP access to candidate images and pages.
//!
//! ## Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use matcher::{MatchConfig, ReverseImagePipeline};
//! use search::{build_provider, SearchConfig};
//!
//! # async fn run(image: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
//! let search = build_provider(&SearchConfig::default().with_api_key("serpapi-key"))?;
//! let pipeline = ReverseImagePipeline::builder(search)
//!     .with_config(MatchConfig::default().with_top_k(5))
//!     .build()?;
//!
//! let report = pipeline.run(&image, "hand-painted ceramic mug").await?;
//! for hit in report.results {
//!     println!("{:.3} {} infringing={:?}", hit.similarity, hit.link, hit.potential_infringement);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Observability
//!
//! Install a [`PipelineMetrics`] implementation via [`set_pipeline_metrics`]
//! (or per pipeline with [`PipelineBuilder::with_metrics`]) to record run
//! latency, run outcome and skipped candidates.

pub mod extract;
pub mod fetch;
pub mod metrics;
pub mod pipeline;
pub mod scoring;
pub mod types;

pub use crate::extract::{extract_page_text, PageText};
pub use crate::fetch::{FetchError, Fetcher, ReqwestFetcher};
pub use crate::metrics::{set_pipeline_metrics, PipelineMetrics, SkipReason};
pub use crate::pipeline::{Enrichment, PipelineBuilder, ReverseImagePipeline};
pub use crate::scoring::{clamp_weight, combine, rank, ScoredCandidate, SimilarityScores};
pub use crate::types::{
    Comparison, MatchConfig, MatchError, MatchResult, PipelineReport, PipelineState, RunStats,
    DEFAULT_USER_AGENT, MAX_CONCURRENCY,
};
