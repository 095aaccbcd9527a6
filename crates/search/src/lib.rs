//! Candidate Image Search
//!
//! Given a text query, ask an image-search provider for visually related
//! hits and return them as [`Candidate`]s in provider order. One call is one
//! HTTP request: no pagination, no retries, a hard timeout (20 s by
//! default).
//!
//! Search is the one stage the reverse-image pipeline cannot do without, so
//! every failure (missing credential, timeout, provider error) is a
//! [`SearchError`] rather than an empty list. An empty list means the
//! provider genuinely found nothing.
//!
//! ```no_run
//! use search::{build_provider, SearchConfig};
//!
//! # async fn run() -> Result<(), search::SearchError> {
//! let provider = build_provider(&SearchConfig::default().with_api_key("serpapi-key"))?;
//! for hit in provider.search("hand-painted ceramic mug", 10).await? {
//!     println!("{} -> {:?}", hit.title, hit.fetch_url());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod types;

mod provider;
mod serpapi;

pub use crate::config::{SearchConfig, SearchProviderKind};
pub use crate::error::SearchError;
pub use crate::provider::{build_provider, SearchProvider, StaticSearchProvider};
pub use crate::serpapi::SerpApiProvider;
pub use crate::types::Candidate;
