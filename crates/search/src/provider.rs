use std::sync::Arc;

use async_trait::async_trait;

use crate::serpapi::SerpApiProvider;
use crate::{Candidate, SearchConfig, SearchError, SearchProviderKind};

/// An image-search backend.
///
/// One call is one provider request: results are finite, ordered, and not
/// restartable. Implementations must not retry.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Up to `max_results` candidates in provider order.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Candidate>, SearchError>;
}

/// Serves a fixed candidate list. Useful for demos and offline tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSearchProvider {
    candidates: Vec<Candidate>,
}

impl StaticSearchProvider {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }
}

#[async_trait]
impl SearchProvider for StaticSearchProvider {
    fn name(&self) -> &str {
        "static"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Candidate>, SearchError> {
        validate_query(query)?;
        Ok(self
            .candidates
            .iter()
            .filter(|c| c.has_image())
            .take(max_results)
            .cloned()
            .collect())
    }
}

/// Trimmed query, or [`SearchError::EmptyQuery`].
pub(crate) fn validate_query(query: &str) -> Result<&str, SearchError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(SearchError::EmptyQuery);
    }
    Ok(trimmed)
}

/// Build the provider selected by `config`.
pub fn build_provider(config: &SearchConfig) -> Result<Arc<dyn SearchProvider>, SearchError> {
    config.validate()?;
    match config.provider {
        SearchProviderKind::SerpApi => Ok(Arc::new(SerpApiProvider::new(config)?)),
        SearchProviderKind::Static => Ok(Arc::new(StaticSearchProvider::new(
            config.static_results.clone(),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hits(n: usize) -> Vec<Candidate> {
        (0..n)
            .map(|i| {
                Candidate::new(format!("hit {i}"), format!("https://site{i}.example/"))
                    .with_thumbnail_url(format!("https://thumbs.example/{i}.jpg"))
            })
            .collect()
    }

    #[tokio::test]
    async fn static_provider_truncates_in_order() {
        let provider = StaticSearchProvider::new(hits(5));
        let results = provider.search("mug", 3).await.unwrap();
        let titles: Vec<_> = results.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, ["hit 0", "hit 1", "hit 2"]);
    }

    #[tokio::test]
    async fn static_provider_skips_hits_without_images() {
        let mut candidates = hits(2);
        candidates.insert(1, Candidate::new("no image", "https://x.example"));
        let results = StaticSearchProvider::new(candidates)
            .search("mug", 10)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(Candidate::has_image));
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let provider = StaticSearchProvider::new(hits(1));
        assert_eq!(
            provider.search("   ", 10).await,
            Err(SearchError::EmptyQuery)
        );
    }

    #[tokio::test]
    async fn zero_hits_is_not_an_error() {
        let provider = StaticSearchProvider::default();
        assert!(provider.search("anything", 10).await.unwrap().is_empty());
    }

    #[test]
    fn build_provider_follows_config() {
        let provider = build_provider(&SearchConfig::default()).unwrap();
        assert_eq!(provider.name(), "serpapi");

        let provider =
            build_provider(&SearchConfig::default().with_static_results(hits(1))).unwrap();
        assert_eq!(provider.name(), "static");
    }
}
