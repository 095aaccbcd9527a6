//! HTTP-level tests for the reverse-image API.
//!
//! The router is driven in-process with `tower::ServiceExt::oneshot`; search,
//! downloads and classification are served by in-test collaborators.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use classify::KeywordClassifier;
use http_body_util::BodyExt;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use matcher::{FetchError, Fetcher, MatchConfig, ReverseImagePipeline};
use search::{Candidate, SearchError, SearchProvider, StaticSearchProvider};
use semantic::{EmbeddingEngine, SemanticConfig, ThumbnailEmbedder};
use serde_json::{json, Value};
use server::{build_router, ServerConfig, ServerState};
use tower::ServiceExt;

const SHOP_PAGE: &str = r#"<html><head><title>Mug Store</title></head>
<body><p>Buy now. Price $24. Add to cart. Free shipping.</p></body></html>"#;

fn pattern_png(invert: bool) -> Vec<u8> {
    let img = ImageBuffer::from_fn(64, 64, |x, y| {
        let fx = x as f64 / 64.0;
        let fy = y as f64 / 64.0;
        let v = 100.0 + 60.0 * (fx * 6.0).sin() * (fy * 4.0).cos() + 30.0 * ((fx + fy) * 3.0).sin();
        let v = v.clamp(0.0, 255.0) as u8;
        let v = if invert { 255 - v } else { v };
        Rgb([v, v, v])
    });
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

#[derive(Default)]
struct FakeFetcher {
    images: HashMap<String, Vec<u8>>,
    pages: HashMap<String, String>,
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.images.get(url).cloned().ok_or(FetchError::Status(404))
    }

    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        self.pages.get(url).cloned().ok_or(FetchError::Status(404))
    }
}

struct DownSearch;

#[async_trait]
impl SearchProvider for DownSearch {
    fn name(&self) -> &str {
        "down"
    }

    async fn search(&self, _query: &str, _max: usize) -> Result<Vec<Candidate>, SearchError> {
        Err(SearchError::Timeout(20))
    }
}

fn candidates() -> Vec<Candidate> {
    vec![
        Candidate::new("Inverted mug", "https://blog.example/post")
            .with_source("Blog")
            .with_thumbnail_url("https://img.example/inverted.png"),
        Candidate::new("Same mug", "https://shop.example/mug")
            .with_source("Shop")
            .with_thumbnail_url("https://img.example/same.png"),
    ]
}

fn pipeline_with(search: Arc<dyn SearchProvider>) -> ReverseImagePipeline {
    let fetcher = FakeFetcher {
        images: HashMap::from([
            ("https://img.example/same.png".to_string(), pattern_png(false)),
            ("https://img.example/inverted.png".to_string(), pattern_png(true)),
        ]),
        pages: HashMap::from([("https://shop.example/mug".to_string(), SHOP_PAGE.to_string())]),
    };
    ReverseImagePipeline::builder(search)
        .with_config(MatchConfig::default())
        .with_engine(Arc::new(EmbeddingEngine::with_backend(
            SemanticConfig::default(),
            Arc::new(ThumbnailEmbedder::default()),
        )))
        .with_fetcher(Arc::new(fetcher))
        .with_classifier(Arc::new(KeywordClassifier))
        .build()
        .unwrap()
}

fn app_with(search: Arc<dyn SearchProvider>) -> Router {
    let state = ServerState::with_pipeline(ServerConfig::default(), Arc::new(pipeline_with(search)));
    build_router(Arc::new(state))
}

fn app() -> Router {
    app_with(Arc::new(StaticSearchProvider::new(candidates())))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn b64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

#[tokio::test]
async fn health_and_info_endpoints() {
    let (status, body) = send(app(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(app(), get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["endpoints"]
        .as_array()
        .unwrap()
        .contains(&json!("/api/v1/reverse-search")));
}

#[tokio::test]
async fn readiness_reports_embedding_backend() {
    let (status, body) = send(app(), get("/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["components"]["embeddings"], "ready");
    assert_eq!(body["components"]["embedding_backend"], "thumbnail");
    assert_eq!(body["components"]["search"], "static");
}

#[tokio::test]
async fn metrics_endpoint_absent_without_recorder() {
    let (status, body) = send(app(), get("/metrics")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let (status, body) = send(app(), get("/api/v1/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn reverse_search_ranks_and_enriches() {
    let request = post_json(
        "/api/v1/reverse-search",
        json!({
            "query": "hand-painted mug",
            "image_base64": b64(&pattern_png(false)),
            "embedding_weight": 0.5,
        }),
    );
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["query"], "hand-painted mug");
    assert_eq!(body["state"], "done");
    assert_eq!(body["total_results"], 2);
    assert_eq!(body["stats"]["candidates_found"], 2);
    assert_eq!(body["stats"]["candidates_scored"], 2);

    let top = &body["results"][0];
    assert_eq!(top["link"], "https://shop.example/mug");
    assert!(top["similarity"].as_f64().unwrap() > 0.99);
    assert!(top["phashSimilarity"].as_f64().unwrap() > 0.99);
    assert_eq!(top["classification"]["label"], "Commercial");
    assert_eq!(top["potentialInfringement"], true);
    assert!(top["textSnippet"].as_str().unwrap().contains("Add to cart"));

    let second = &body["results"][1];
    assert_eq!(second["link"], "https://blog.example/post");
    assert!(second.get("classification").is_none());
    assert!(second.get("potentialInfringement").is_none());
}

#[tokio::test]
async fn reverse_search_accepts_data_urls_and_echoes_request_id() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/reverse-search")
        .header("content-type", "application/json")
        .header("x-request-id", "req-42")
        .body(Body::from(
            json!({
                "query": "mug",
                "image_base64": format!("data:image/png;base64,{}", b64(&pattern_png(false))),
                "top_k": 1,
            })
            .to_string(),
        ))
        .unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-42");
}

#[tokio::test]
async fn reverse_search_rejects_bad_input() {
    let empty_query = post_json(
        "/api/v1/reverse-search",
        json!({"query": "  ", "image_base64": b64(&pattern_png(false))}),
    );
    let (status, body) = send(app(), empty_query).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let bad_base64 = post_json(
        "/api/v1/reverse-search",
        json!({"query": "mug", "image_base64": "%%%"}),
    );
    let (status, body) = send(app(), bad_base64).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let bad_weight = post_json(
        "/api/v1/reverse-search",
        json!({"query": "mug", "image_base64": b64(&pattern_png(false)), "top_k": 0}),
    );
    let (status, body) = send(app(), bad_weight).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let malformed = Request::builder()
        .method("POST")
        .uri("/api/v1/reverse-search")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(app(), malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn undecodable_query_image_is_422() {
    let request = post_json(
        "/api/v1/reverse-search",
        json!({"query": "mug", "image_base64": b64(b"definitely not an image")}),
    );
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "INVALID_IMAGE");
}

#[tokio::test]
async fn search_outage_is_502() {
    let request = post_json(
        "/api/v1/reverse-search",
        json!({"query": "mug", "image_base64": b64(&pattern_png(false))}),
    );
    let (status, body) = send(app_with(Arc::new(DownSearch)), request).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "SEARCH_UNAVAILABLE");
}

#[tokio::test]
async fn fingerprint_endpoint_returns_hex() {
    let request = post_json(
        "/api/v1/fingerprint",
        json!({"image_base64": b64(&pattern_png(false))}),
    );
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::OK);
    let hash = body["fingerprint"].as_str().unwrap();
    assert_eq!(hash.len(), 16);
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    assert_eq!(body["grid_size"], 32);
    assert_eq!(body["normalize_size"], 256);

    let expected = pipeline_with(Arc::new(StaticSearchProvider::default()))
        .fingerprint(&pattern_png(false))
        .await
        .unwrap();
    assert_eq!(hash, expected.hash());
}

#[tokio::test]
async fn compare_endpoint_scores_pairs() {
    let same = post_json(
        "/api/v1/compare",
        json!({"image_a": b64(&pattern_png(false)), "image_b": b64(&pattern_png(false))}),
    );
    let (status, body) = send(app(), same).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hamming_distance"], 0);
    assert!(body["perceptual_similarity"].as_f64().unwrap() > 0.999);
    assert!(body["combined_similarity"].as_f64().unwrap() > 0.99);

    let different = post_json(
        "/api/v1/compare",
        json!({
            "image_a": b64(&pattern_png(false)),
            "image_b": b64(&pattern_png(true)),
            "embedding_weight": 0.0,
        }),
    );
    let (status, body) = send(app(), different).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["hamming_distance"].as_u64().unwrap() > 0);
    let perceptual = body["perceptual_similarity"].as_f64().unwrap();
    let combined = body["combined_similarity"].as_f64().unwrap();
    assert!((perceptual - combined).abs() < 1e-6);

    let missing = post_json("/api/v1/compare", json!({"image_a": b64(&pattern_png(false))}));
    let (status, _) = send(app(), missing).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
