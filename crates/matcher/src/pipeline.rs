use std::sync::Arc;
use std::time::{Duration, Instant};

use classify::{
    build_explanation_prompt, classify_or_fallback, explain_or_empty, Classification,
    ContentClassifier, DisabledClassifier, Explainer, UsageLabel,
};
use futures::stream::{self, StreamExt};
use perceptual::{
    compute_fingerprint_with_config, normalize_image, ImageFingerprint, PerceptualConfig,
    PerceptualError,
};
use search::{Candidate, SearchProvider};
use semantic::EmbeddingEngine;
use tracing::{debug, info, warn};

use crate::extract::{extract_page_text, truncate_chars, PageText};
use crate::fetch::{Fetcher, ReqwestFetcher};
use crate::metrics::{metrics_recorder, PipelineMetrics, SkipReason};
use crate::scoring::{combine, rank, ScoredCandidate};
use crate::types::{
    Comparison, MatchConfig, MatchError, MatchResult, PipelineReport, PipelineState, RunStats,
};


/// Page-derived annotations attached to a high-similarity candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Enrichment {
    pub text_snippet: String,
    pub classification: Classification,
    pub likely_infringing: bool,
    pub explanation: Option<String>,
}

/// The query image after normalization, ready to be compared against.
struct QueryImage {
    normalized: Vec<u8>,
    fingerprint: ImageFingerprint,
}

/// Orchestrates search, scoring, ranking and enrichment for one query image.
///
/// Every collaborator sits behind a trait object so deployments and tests
/// can swap them independently. The pipeline holds no per-run state and can
/// be shared across concurrent requests.
pub struct ReverseImagePipeline {
    config: MatchConfig,
    perceptual: PerceptualConfig,
    engine: Arc<EmbeddingEngine>,
    search: Arc<dyn SearchProvider>,
    fetcher: Arc<dyn Fetcher>,
    classifier: Arc<dyn ContentClassifier>,
    explainer: Option<Arc<dyn Explainer>>,
    metrics: Option<Arc<dyn PipelineMetrics>>,
}

impl std::fmt::Debug for ReverseImagePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReverseImagePipeline")
            .field("config", &self.config)
            .field("search", &self.search.name())
            .field("classifier", &self.classifier.name())
            .field("explainer", &self.explainer.as_ref().map(|e| e.name().to_string()))
            .field("engine", &self.engine)
            .finish()
    }
}

/// Builder for [`ReverseImagePipeline`].
pub struct PipelineBuilder {
    config: MatchConfig,
    perceptual: PerceptualConfig,
    engine: Option<Arc<EmbeddingEngine>>,
    search: Arc<dyn SearchProvider>,
    fetcher: Option<Arc<dyn Fetcher>>,
    classifier: Option<Arc<dyn ContentClassifier>>,
    explainer: Option<Arc<dyn Explainer>>,
    metrics: Option<Arc<dyn PipelineMetrics>>,
}

impl PipelineBuilder {
    pub fn with_config(mut self, config: MatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_perceptual_config(mut self, config: PerceptualConfig) -> Self {
        self.perceptual = config;
        self
    }

    pub fn with_engine(mut self, engine: Arc<EmbeddingEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ContentClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_explainer(mut self, explainer: Arc<dyn Explainer>) -> Self {
        self.explainer = Some(explainer);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn PipelineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Validate configuration and fill in defaults: a disabled embedding
    /// engine, an HTTP fetcher and a classifier that always falls back.
    pub fn build(self) -> Result<ReverseImagePipeline, MatchError> {
        self.config.validate()?;
        self.perceptual
            .validate()
            .map_err(|e| MatchError::InvalidConfig(e.to_string()))?;

        let fetcher: Arc<dyn Fetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(
                ReqwestFetcher::from_config(&self.config)
                    .map_err(|e| MatchError::InvalidConfig(e.to_string()))?,
            ),
        };

        Ok(ReverseImagePipeline {
            config: self.config,
            perceptual: self.perceptual,
            engine: self
                .engine
                .unwrap_or_else(|| Arc::new(EmbeddingEngine::disabled())),
            search: self.search,
            fetcher,
            classifier: self
                .classifier
                .unwrap_or_else(|| Arc::new(DisabledClassifier::new("no classifier configured"))),
            explainer: self.explainer,
            metrics: self.metrics,
        })
    }
}

impl ReverseImagePipeline {
    pub fn builder(search: Arc<dyn SearchProvider>) -> PipelineBuilder {
        PipelineBuilder {
            config: MatchConfig::default(),
            perceptual: PerceptualConfig::default(),
            engine: None,
            search,
            fetcher: None,
            classifier: None,
            explainer: None,
            metrics: None,
        }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn engine(&self) -> &Arc<EmbeddingEngine> {
        &self.engine
    }

    pub fn search_provider(&self) -> &str {
        self.search.name()
    }

    /// Run with the pipeline's own configuration.
    pub async fn run(&self, image_bytes: &[u8], query: &str) -> Result<PipelineReport, MatchError> {
        self.run_with_config(image_bytes, query, &self.config).await
    }

    /// Ranked results only.
    pub async fn reverse_search(
        &self,
        image_bytes: &[u8],
        query: &str,
    ) -> Result<Vec<MatchResult>, MatchError> {
        Ok(self.run(image_bytes, query).await?.results)
    }

    /// Run with per-request overrides.
    ///
    /// Fails only on an invalid config, an unusable query image, or a
    /// search failure. Everything after search degrades per candidate.
    pub async fn run_with_config(
        &self,
        image_bytes: &[u8],
        query: &str,
        config: &MatchConfig,
    ) -> Result<PipelineReport, MatchError> {
        config.validate()?;
        if query.trim().is_empty() {
            return Err(MatchError::InvalidConfig("query must not be empty".into()));
        }
        let started = Instant::now();
        let query_image = self.prepare_image(image_bytes, config).await?;

        let mut run = RunTracker::start();
        let candidates = match self.search.search(query, config.max_candidates).await {
            Ok(candidates) => candidates,
            Err(err) => {
                run.advance(PipelineState::Failed);
                warn!(provider = self.search.name(), error = %err, "search_failed");
                self.record_run(PipelineState::Failed, started.elapsed(), &run.stats);
                return Err(MatchError::SearchUnavailable(err));
            }
        };
        run.stats.candidates_found = candidates.len();

        run.advance(PipelineState::Scoring);
        let query_embedding = self
            .engine
            .compute_embedding(&query_image.normalized)
            .await;
        if let Some(reason) = query_embedding.unavailable_reason() {
            debug!(reason = %reason, "query_embedding_unavailable");
        }
        run.stats.embedding_available = query_embedding.is_available();
        let mut scored = self
            .score_candidates(
                candidates,
                &query_image.fingerprint,
                query_embedding.as_vector(),
                config,
            )
            .await;
        run.stats.candidates_scored = scored.len();
        run.stats.candidates_skipped = run.stats.candidates_found - scored.len();

        run.advance(PipelineState::Ranking);
        rank(&mut scored);

        run.advance(PipelineState::Enriching);
        let enrichments = self.enrich_candidates(&scored, config).await;
        run.stats.candidates_enriched = enrichments.iter().filter(|e| e.is_some()).count();

        run.advance(PipelineState::Done);
        let mut enrichments = enrichments.into_iter();
        let results: Vec<MatchResult> = scored
            .into_iter()
            .map(|s| to_result(s, enrichments.next().flatten()))
            .collect();

        let latency = started.elapsed();
        info!(
            provider = self.search.name(),
            found = run.stats.candidates_found,
            scored = run.stats.candidates_scored,
            skipped = run.stats.candidates_skipped,
            enriched = run.stats.candidates_enriched,
            embedding_available = run.stats.embedding_available,
            latency_ms = latency.as_millis() as u64,
            "reverse_search_completed"
        );
        self.record_run(PipelineState::Done, latency, &run.stats);

        Ok(PipelineReport {
            state: run.state,
            transitions: run.transitions,
            results,
            stats: run.stats,
        })
    }

    /// Fingerprint an image the way query and candidate images are
    /// fingerprinted (normalized first).
    pub async fn fingerprint(&self, image_bytes: &[u8]) -> Result<ImageFingerprint, MatchError> {
        Ok(self.prepare_image(image_bytes, &self.config).await?.fingerprint)
    }

    /// Score two images directly against each other.
    pub async fn compare(
        &self,
        image_a: &[u8],
        image_b: &[u8],
        embedding_weight: Option<f32>,
    ) -> Result<Comparison, MatchError> {
        let a = self.prepare_image(image_a, &self.config).await?;
        let b = self.prepare_image(image_b, &self.config).await?;
        let weight = embedding_weight.unwrap_or(self.config.embedding_weight);

        let emb_a = self.engine.compute_embedding(&a.normalized).await;
        let emb_b = if emb_a.is_available() {
            self.engine.compute_embedding(&b.normalized).await
        } else {
            emb_a.clone()
        };
        let scores = combine(
            Some(&a.fingerprint),
            Some(&b.fingerprint),
            emb_a.as_vector(),
            emb_b.as_vector(),
            weight,
        );

        Ok(Comparison {
            hamming_distance: a.fingerprint.hamming_distance(&b.fingerprint),
            fingerprint_a: a.fingerprint,
            fingerprint_b: b.fingerprint,
            perceptual_similarity: scores.perceptual,
            embedding_similarity: scores.embedding,
            combined_similarity: scores.combined,
        })
    }

    async fn prepare_image(
        &self,
        image_bytes: &[u8],
        config: &MatchConfig,
    ) -> Result<QueryImage, MatchError> {
        prepare_blocking(image_bytes.to_vec(), config.normalize_size, self.perceptual.clone())
            .await
            .map_err(|e| MatchError::Internal(format!("image task failed: {e}")))?
            .map_err(MatchError::InvalidQueryImage)
    }

    async fn score_candidates(
        &self,
        candidates: Vec<Candidate>,
        query_fp: &ImageFingerprint,
        query_vec: Option<&[f32]>,
        config: &MatchConfig,
    ) -> Vec<ScoredCandidate> {
        let outcomes: Vec<Result<ScoredCandidate, SkipReason>> =
            stream::iter(candidates.into_iter().enumerate())
                .map(|(search_rank, candidate)| {
                    self.score_candidate(search_rank, candidate, query_fp, query_vec, config)
                })
                .buffered(config.concurrency)
                .collect()
                .await;

        let mut scored = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                Ok(candidate) => scored.push(candidate),
                Err(reason) => {
                    if let Some(metrics) = self.metrics() {
                        metrics.record_candidate_skipped(reason);
                    }
                }
            }
        }
        scored
    }

    async fn score_candidate(
        &self,
        search_rank: usize,
        candidate: Candidate,
        query_fp: &ImageFingerprint,
        query_vec: Option<&[f32]>,
        config: &MatchConfig,
    ) -> Result<ScoredCandidate, SkipReason> {
        let Some(url) = candidate.fetch_url() else {
            debug!(search_rank, "candidate_without_image");
            return Err(SkipReason::NoImageUrl);
        };

        let bytes = self.fetcher.fetch_bytes(url).await.map_err(|err| {
            debug!(search_rank, url, error = %err, "candidate_unreachable");
            SkipReason::Fetch
        })?;
        let QueryImage {
            normalized,
            fingerprint,
        } = match prepare_blocking(bytes, config.normalize_size, self.perceptual.clone()).await {
            Ok(Ok(prepared)) => prepared,
            Ok(Err(err)) => {
                debug!(search_rank, url, error = %err, "candidate_undecodable");
                return Err(SkipReason::Decode);
            }
            Err(err) => {
                warn!(search_rank, url, error = %err, "candidate_image_task_failed");
                return Err(SkipReason::Decode);
            }
        };

        // Skip candidate inference when the query has no vector.
        let candidate_vec = match query_vec {
            Some(_) => self.engine.compute_embedding(&normalized).await.into_vector(),
            None => None,
        };

        let scores = combine(
            Some(query_fp),
            Some(&fingerprint),
            query_vec,
            candidate_vec.as_deref(),
            config.effective_weight(),
        );
        debug!(
            search_rank,
            combined = scores.combined,
            perceptual = scores.perceptual,
            embedding = ?scores.embedding,
            "candidate_scored"
        );

        Ok(ScoredCandidate {
            candidate,
            search_rank,
            fingerprint,
            scores,
        })
    }

    /// One slot per top-k candidate, `Some` where the threshold was met.
    async fn enrich_candidates<'a>(
        &self,
        ranked: &'a [ScoredCandidate],
        config: &MatchConfig,
    ) -> Vec<Option<Enrichment>> {
        let pending: Vec<_> = ranked
            .iter()
            .take(config.top_k)
            .map(|scored: &'a ScoredCandidate| async move {
                if scored.combined() >= config.enrichment_threshold {
                    Some(self.enrich(scored, config).await)
                } else {
                    None
                }
            })
            .collect();
        stream::iter(pending)
            .buffered(config.concurrency)
            .collect()
            .await
    }

    async fn enrich(&self, scored: &ScoredCandidate, config: &MatchConfig) -> Enrichment {
        let link = scored.candidate.link.as_str();
        let page = match self.fetcher.fetch_text(link).await {
            Ok(html) => extract_page_text(&html),
            Err(err) => {
                debug!(link, error = %err, "page_unreachable");
                PageText::default()
            }
        };
        let text = page.combined();

        let classification = classify_or_fallback(
            self.classifier.as_ref(),
            truncate_chars(&text, config.classification_chars),
        )
        .await;
        let text_snippet = truncate_chars(&text, config.snippet_chars).to_string();
        let likely_infringing = scored.combined() >= config.enrichment_threshold
            && classification.label == UsageLabel::Commercial;

        let explanation = match &self.explainer {
            Some(explainer) => {
                let prompt = build_explanation_prompt(
                    &scored.candidate.title,
                    scored.combined(),
                    &classification,
                    &text_snippet,
                );
                Some(explain_or_empty(explainer.as_ref(), &prompt).await)
                    .filter(|text| !text.is_empty())
            }
            None => None,
        };

        debug!(
            link,
            label = %classification.label,
            score = classification.score,
            fallback = classification.is_fallback(),
            likely_infringing,
            "candidate_enriched"
        );

        Enrichment {
            text_snippet,
            classification,
            likely_infringing,
            explanation,
        }
    }

    fn metrics(&self) -> Option<Arc<dyn PipelineMetrics>> {
        self.metrics.clone().or_else(metrics_recorder)
    }

    fn record_run(&self, state: PipelineState, latency: Duration, stats: &RunStats) {
        if let Some(metrics) = self.metrics() {
            metrics.record_run(state, latency, stats);
        }
    }
}

/// Normalize and fingerprint on the blocking pool; decoding, resizing and
/// the DCT would otherwise hold an executor thread.
async fn prepare_blocking(
    bytes: Vec<u8>,
    normalize_size: u32,
    perceptual: PerceptualConfig,
) -> Result<Result<QueryImage, PerceptualError>, tokio::task::JoinError> {
    tokio::task::spawn_blocking(move || {
        let normalized = normalize_image(&bytes, normalize_size)?;
        let fingerprint = compute_fingerprint_with_config(&normalized, &perceptual)?;
        Ok(QueryImage {
            normalized,
            fingerprint,
        })
    })
    .await
}

fn to_result(scored: ScoredCandidate, enrichment: Option<Enrichment>) -> MatchResult {
    let ScoredCandidate {
        candidate, scores, ..
    } = scored;
    let mut result = MatchResult {
        title: candidate.title,
        source: candidate.source,
        link: candidate.link,
        image_url: candidate.image_url,
        thumbnail_url: candidate.thumbnail_url,
        similarity: scores.combined,
        phash_similarity: scores.perceptual,
        clip_similarity: scores.embedding,
        classification: None,
        potential_infringement: None,
        text_snippet: None,
        explanation: None,
    };
    if let Some(enrichment) = enrichment {
        result.classification = Some(enrichment.classification);
        result.potential_infringement = Some(enrichment.likely_infringing);
        result.text_snippet = Some(enrichment.text_snippet).filter(|s| !s.is_empty());
        result.explanation = enrichment.explanation;
    }
    result
}

/// State and counters of one run.
struct RunTracker {
    state: PipelineState,
    transitions: Vec<PipelineState>,
    stats: RunStats,
}

impl RunTracker {
    fn start() -> Self {
        debug!(to = %PipelineState::Searching, "pipeline_transition");
        Self {
            state: PipelineState::Searching,
            transitions: vec![PipelineState::Searching],
            stats: RunStats::default(),
        }
    }

    fn advance(&mut self, next: PipelineState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        debug!(from = %self.state, to = %next, "pipeline_transition");
        self.state = next;
        self.transitions.push(next);
    }
}
