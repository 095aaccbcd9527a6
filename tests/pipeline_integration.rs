//! End-to-end runs through a pipeline assembled from YAML configuration.

mod common;

use common::{hit, offline_config, pattern_png, FakeFetcher, COURSE_PAGE, SHOP_PAGE};
use reverse_image::{
    pipeline_builder, ClassificationSource, MatchConfig, PipelineState, ReverseImagePipeline,
    UsageLabel,
};
use std::sync::Arc;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}

fn build(candidates: &[reverse_image::Candidate], fetcher: FakeFetcher) -> ReverseImagePipeline {
    pipeline_builder(&offline_config(candidates))
        .unwrap()
        .with_fetcher(Arc::new(fetcher))
        .build()
        .unwrap()
}

fn standard_fetcher() -> FakeFetcher {
    FakeFetcher::default()
        .image("https://img.example/inverted.png", pattern_png(true))
        .image("https://img.example/shop.png", pattern_png(false))
        .image("https://img.example/course.png", pattern_png(false))
        .page("https://shop.example/mug", SHOP_PAGE)
        .page("https://uni.example/ceramics", COURSE_PAGE)
}

#[tokio::test]
async fn ranks_skips_and_enriches_end_to_end() {
    let candidates = vec![
        hit("inverted", "https://blog.example/post"),
        hit("shop", "https://shop.example/mug"),
        hit("gone", "https://gone.example/"),
        hit("course", "https://uni.example/ceramics"),
    ];
    let pipeline = build(&candidates, standard_fetcher());

    let report = pipeline
        .run(&pattern_png(false), "hand-painted mug")
        .await
        .unwrap();

    assert_eq!(report.state, PipelineState::Done);
    assert_eq!(
        report.transitions,
        vec![
            PipelineState::Searching,
            PipelineState::Scoring,
            PipelineState::Ranking,
            PipelineState::Enriching,
            PipelineState::Done,
        ]
    );
    assert_eq!(report.stats.candidates_found, 4);
    assert_eq!(report.stats.candidates_scored, 3);
    assert_eq!(report.stats.candidates_skipped, 1);
    assert_eq!(report.stats.candidates_enriched, 2);
    assert!(report.stats.embedding_available);

    let links: Vec<_> = report.results.iter().map(|r| r.link.as_str()).collect();
    assert_eq!(
        links,
        [
            "https://shop.example/mug",
            "https://uni.example/ceramics",
            "https://blog.example/post"
        ]
    );

    let shop = &report.results[0];
    assert!(shop.similarity > 0.99);
    let classification = shop.classification.unwrap();
    assert_eq!(classification.label, UsageLabel::Commercial);
    assert_eq!(classification.source, ClassificationSource::Model);
    assert_eq!(shop.potential_infringement, Some(true));
    assert!(shop.text_snippet.as_deref().unwrap().starts_with("Mug Store"));

    let course = &report.results[1];
    assert_eq!(course.classification.unwrap().label, UsageLabel::Educational);
    assert_eq!(course.potential_infringement, Some(false));

    let inverted = &report.results[2];
    assert!(inverted.similarity < 0.8);
    assert!(inverted.classification.is_none());
    assert!(inverted.potential_infringement.is_none());
    assert!(inverted.text_snippet.is_none());
}

#[tokio::test]
async fn empty_search_completes_with_no_results() {
    let pipeline = build(&[], FakeFetcher::default());
    let report = pipeline.run(&pattern_png(false), "mug").await.unwrap();
    assert_eq!(report.state, PipelineState::Done);
    assert!(report.results.is_empty());
    assert_eq!(report.stats.candidates_found, 0);
    assert_eq!(report.transitions.last(), Some(&PipelineState::Done));
}

#[tokio::test]
async fn embeddings_disabled_through_environment() {
    let candidates = vec![hit("shop", "https://shop.example/mug")];
    let mut config = offline_config(&candidates);
    config.apply_overrides_with(|name| {
        (name == reverse_image::ENV_EMBEDDINGS_ENABLED).then(|| "0".to_string())
    });
    assert!(!config.semantic.enabled);

    let pipeline = pipeline_builder(&config)
        .unwrap()
        .with_fetcher(Arc::new(standard_fetcher()))
        .build()
        .unwrap();

    let report = pipeline.run(&pattern_png(false), "mug").await.unwrap();
    assert!(!report.stats.embedding_available);
    let result = &report.results[0];
    assert!(result.clip_similarity.is_none());
    assert!(approx(result.phash_similarity, 1.0));
    // Perceptual-only score scaled by (1 - weight).
    assert!(approx(result.similarity, 0.5));
    // Below the enrichment threshold, so never classified.
    assert!(result.classification.is_none());

    let perceptual_only = MatchConfig::default().with_embedding_weight(0.0);
    let report = pipeline
        .run_with_config(&pattern_png(false), "mug", &perceptual_only)
        .await
        .unwrap();
    assert!(approx(report.results[0].similarity, 1.0));
    assert!(report.results[0].classification.is_some());
}

#[tokio::test]
async fn results_serialize_with_camel_case_fields() {
    let candidates = vec![
        hit("shop", "https://shop.example/mug"),
        hit("inverted", "https://blog.example/post"),
    ];
    let pipeline = build(&candidates, standard_fetcher());
    let results = pipeline
        .reverse_search(&pattern_png(false), "mug")
        .await
        .unwrap();

    let json = serde_json::to_value(&results).unwrap();
    let top = &json[0];
    for key in [
        "title",
        "source",
        "link",
        "thumbnailUrl",
        "similarity",
        "phashSimilarity",
        "clipSimilarity",
        "classification",
        "potentialInfringement",
        "textSnippet",
    ] {
        assert!(top.get(key).is_some(), "missing {key}");
    }
    assert!(top.get("imageUrl").is_none());
    assert!(top.get("explanation").is_none());

    let bottom = &json[1];
    assert!(bottom.get("classification").is_none());
    assert!(bottom.get("textSnippet").is_none());
}

/// Out-of-the-box settings: only search and the classifier are swapped for
/// offline stand-ins. The embedding signal must be live so identical images
/// clear the default enrichment threshold.
#[cfg(not(feature = "onnx"))]
#[tokio::test]
async fn default_settings_enrich_an_identical_image() {
    let mut config = reverse_image::ReverseImageConfig::default();
    config.search.provider = reverse_image::SearchProviderKind::Static;
    config.search.static_results = vec![hit("shop", "https://shop.example/mug")];
    config.classify.provider = reverse_image::ClassifierKind::Keyword;
    assert_eq!(config.semantic, reverse_image::SemanticConfig::default());
    assert_eq!(config.matcher, MatchConfig::default());

    let pipeline = pipeline_builder(&config)
        .unwrap()
        .with_fetcher(Arc::new(standard_fetcher()))
        .build()
        .unwrap();

    let report = pipeline.run(&pattern_png(false), "mug").await.unwrap();
    assert!(report.stats.embedding_available);
    assert_eq!(pipeline.engine().backend_name(), Some("thumbnail"));

    let result = &report.results[0];
    assert!(approx(result.phash_similarity, 1.0));
    assert!(approx(result.clip_similarity.unwrap(), 1.0));
    assert!(approx(result.similarity, 1.0));
    assert_eq!(result.classification.unwrap().label, UsageLabel::Commercial);
    assert_eq!(result.potential_infringement, Some(true));
}
