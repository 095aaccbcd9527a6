use serde::{Deserialize, Serialize};

/// One image hit returned by a search provider.
///
/// Read-only once fetched; the provider's ordering is meaningful and is
/// preserved by everything downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub title: String,
    /// Display name of the hosting site (e.g. "Etsy").
    pub source: String,
    /// URL of the page that hosts the image.
    pub link: String,
    /// Full-resolution image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Provider-hosted thumbnail URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

impl Candidate {
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            ..Default::default()
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn with_thumbnail_url(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }

    /// URL to download for scoring: the thumbnail when present, otherwise
    /// the full image.
    pub fn fetch_url(&self) -> Option<&str> {
        non_empty(self.thumbnail_url.as_deref()).or_else(|| non_empty(self.image_url.as_deref()))
    }

    /// Whether the hit carries anything that can be downloaded.
    pub fn has_image(&self) -> bool {
        self.fetch_url().is_some()
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_url_prefers_thumbnail() {
        let c = Candidate::new("t", "https://shop.example/p/1")
            .with_image_url("https://cdn.example/full.jpg")
            .with_thumbnail_url("https://thumbs.example/t.jpg");
        assert_eq!(c.fetch_url(), Some("https://thumbs.example/t.jpg"));
    }

    #[test]
    fn fetch_url_falls_back_to_image() {
        let c = Candidate::new("t", "https://shop.example/p/1")
            .with_image_url("https://cdn.example/full.jpg")
            .with_thumbnail_url("  ");
        assert_eq!(c.fetch_url(), Some("https://cdn.example/full.jpg"));
        assert!(c.has_image());
    }

    #[test]
    fn candidate_without_urls_has_no_image() {
        assert!(!Candidate::new("t", "https://x.example").has_image());
    }

    #[test]
    fn serializes_camel_case() {
        let c = Candidate::new("Mug", "https://shop.example/mug")
            .with_source("Shop")
            .with_image_url("https://cdn.example/mug.png");
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["imageUrl"], "https://cdn.example/mug.png");
        assert!(json.get("thumbnailUrl").is_none());
        assert_eq!(json["source"], "Shop");
    }
}
