use thiserror::Error;

/// Why a candidate search produced nothing.
///
/// Every variant means "search unavailable" to the pipeline; the split is
/// kept for logs and HTTP error messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("search provider credential is not configured")]
    MissingCredential,
    #[error("search query must not be empty")]
    EmptyQuery,
    #[error("search request timed out after {0}s")]
    Timeout(u64),
    #[error("search request failed: {0}")]
    Http(String),
    #[error("search provider returned an error: {0}")]
    Provider(String),
    #[error("unexpected search response: {0}")]
    Parse(String),
    #[error("invalid search config: {0}")]
    InvalidConfig(String),
}
