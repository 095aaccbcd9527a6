use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Url;
use thiserror::Error;
use tracing::trace;

use crate::MatchConfig;

/// Largest body accepted from a candidate host.
pub const MAX_BODY_BYTES: u64 = 20 * 1024 * 1024;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("invalid url `{0}`")]
    InvalidUrl(String),
    #[error("fetch timed out")]
    Timeout,
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("response body is too large")]
    TooLarge,
    #[error("fetch failed: {0}")]
    Http(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Http(err.without_url().to_string())
        }
    }
}

/// Generic HTTP fetcher for candidate images and hosting pages.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError>;

    async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;
}

/// [`Fetcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
    image_timeout: Duration,
    page_timeout: Duration,
}

impl ReqwestFetcher {
    pub fn new(
        user_agent: &str,
        image_timeout: Duration,
        page_timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| FetchError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            image_timeout,
            page_timeout,
        })
    }

    pub fn from_config(config: &MatchConfig) -> Result<Self, FetchError> {
        Self::new(
            &config.user_agent,
            Duration::from_secs(config.image_timeout_secs),
            Duration::from_secs(config.page_timeout_secs),
        )
    }

    async fn get(&self, url: &str, timeout: Duration, accept: &str) -> Result<reqwest::Response, FetchError> {
        let parsed = parse_http_url(url)?;
        let response = self
            .client
            .get(parsed)
            .header(ACCEPT, accept)
            .timeout(timeout)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        if response.content_length().is_some_and(|len| len > MAX_BODY_BYTES) {
            return Err(FetchError::TooLarge);
        }
        Ok(response)
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.get(url, self.image_timeout, "image/*,*/*;q=0.8").await?;
        let bytes = read_capped(response, MAX_BODY_BYTES).await?;
        trace!(url, len = bytes.len(), "image_fetched");
        Ok(bytes)
    }

    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .get(url, self.page_timeout, "text/html,application/xhtml+xml,*/*;q=0.8")
            .await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = read_capped(response, MAX_BODY_BYTES).await?;
        let text = String::from_utf8_lossy(&body).into_owned();
        trace!(url, len = text.len(), content_type = %content_type, "page_fetched");
        Ok(text)
    }
}

/// Read the body chunk by chunk, giving up as soon as it exceeds `cap`.
///
/// `Content-Length` is only a hint; chunked responses carry none.
async fn read_capped(mut response: reqwest::Response, cap: u64) -> Result<Vec<u8>, FetchError> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if (body.len() + chunk.len()) as u64 > cap {
            return Err(FetchError::TooLarge);
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

fn parse_http_url(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url.trim()).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        _ => Err(FetchError::InvalidUrl(url.to_string())),
    }
}
