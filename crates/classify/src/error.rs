use thiserror::Error;

/// Failures inside classification or explanation calls.
///
/// Callers normally use [`crate::classify_or_fallback`] and
/// [`crate::explain_or_empty`], which swallow these into typed defaults.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("classifier is not configured: {0}")]
    NotConfigured(String),
    #[error("classification request failed: {0}")]
    Http(String),
    #[error("classification request timed out")]
    Timeout,
    #[error("unexpected classifier response: {0}")]
    Parse(String),
    #[error("invalid classify config: {0}")]
    InvalidConfig(String),
}

impl ClassifyError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClassifyError::Timeout
        } else {
            ClassifyError::Http(err.without_url().to_string())
        }
    }
}
