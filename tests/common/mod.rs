#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use image::{DynamicImage, ImageBuffer, ImageFormat, Luma, Rgb};
use matcher::{FetchError, Fetcher};
use reverse_image::{Candidate, ReverseImageConfig, SearchError, SearchProvider};

pub const SHOP_PAGE: &str = r#"<html><head><title>Mug Store</title>
<meta name="description" content="Buy hand-painted mugs online"></head>
<body><p>Price $24. Add to cart. Free shipping.</p></body></html>"#;

pub const COURSE_PAGE: &str = r#"<html><head><title>Ceramics 101</title></head>
<body><p>Lecture notes for the university course. Glazing tutorial and lesson plan.</p></body></html>"#;

pub fn encode(img: DynamicImage) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

/// Smooth greyscale pattern rendered at `size x size`. The pattern is a
/// function of relative position, so different sizes depict the same picture.
pub fn pattern_png_sized(size: u32, invert: bool) -> Vec<u8> {
    let img = ImageBuffer::from_fn(size, size, |x, y| {
        let fx = x as f64 / size as f64;
        let fy = y as f64 / size as f64;
        let v = 100.0 + 60.0 * (fx * 6.0).sin() * (fy * 4.0).cos() + 30.0 * ((fx + fy) * 3.0).sin();
        let v = v.clamp(0.0, 255.0) as u8;
        let v = if invert { 255 - v } else { v };
        Rgb([v, v, v])
    });
    encode(DynamicImage::ImageRgb8(img))
}

pub fn pattern_png(invert: bool) -> Vec<u8> {
    pattern_png_sized(64, invert)
}

/// Uniform random greyscale noise from a seeded generator.
pub fn noise_png(seed: u64) -> Vec<u8> {
    let mut rng = fastrand::Rng::with_seed(seed);
    let img = ImageBuffer::from_fn(64, 64, |_, _| Luma([rng.u8(..)]));
    encode(DynamicImage::ImageLuma8(img))
}

/// Serves images and pages from in-memory maps; everything else is a 404.
#[derive(Default)]
pub struct FakeFetcher {
    pub images: HashMap<String, Vec<u8>>,
    pub pages: HashMap<String, String>,
    pub page_calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn image(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.images.insert(url.to_string(), bytes);
        self
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn page_calls(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.images.get(url).cloned().ok_or(FetchError::Status(404))
    }

    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        self.pages.get(url).cloned().ok_or(FetchError::Status(404))
    }
}

/// Counts calls and answers with a fixed result.
pub struct CountingSearch {
    pub result: Result<Vec<Candidate>, SearchError>,
    pub calls: AtomicUsize,
}

impl CountingSearch {
    pub fn ok(candidates: Vec<Candidate>) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(candidates),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(err: SearchError) -> Arc<Self> {
        Arc::new(Self {
            result: Err(err),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchProvider for CountingSearch {
    fn name(&self) -> &str {
        "counting"
    }

    async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<Candidate>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result
            .clone()
            .map(|hits| hits.into_iter().take(max_results).collect())
    }
}

pub fn hit(name: &str, link: &str) -> Candidate {
    Candidate::new(format!("{name} hit"), link)
        .with_source(name)
        .with_thumbnail_url(format!("https://img.example/{name}.png"))
}

/// Offline configuration: static search, thumbnail embeddings, keyword
/// classifier.
pub fn offline_config(candidates: &[Candidate]) -> ReverseImageConfig {
    let hits = serde_yaml_hits(candidates);
    let yaml = format!(
        r#"
version: "1.0"
name: "offline"
semantic:
  backend: "thumbnail"
search:
  provider: "static"
  static_results: {hits}
classify:
  provider: "keyword"
"#
    );
    ReverseImageConfig::from_yaml(&yaml).unwrap()
}

fn serde_yaml_hits(candidates: &[Candidate]) -> String {
    // JSON is valid YAML flow syntax.
    serde_json::to_string(candidates).unwrap()
}
