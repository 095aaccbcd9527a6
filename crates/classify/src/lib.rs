//! Content Classification
//!
//! Labels the text of a page that hosts a matched image as `Commercial`,
//! `Educational` or `Safe`, and optionally asks a text-generation endpoint
//! for a one-line rationale.
//!
//! Neither call may block a reverse-image run. [`classify_or_fallback`]
//! turns every failure (no token, timeout, malformed response) into
//! [`Classification::fallback`], i.e. `Safe` at 0.5, and
//! [`explain_or_empty`] turns every failure into an empty string.
//!
//! ```
//! use classify::{classify_or_fallback, KeywordClassifier, UsageLabel};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let c = classify_or_fallback(&KeywordClassifier, "Price $12, add to cart").await;
//! assert_eq!(c.label, UsageLabel::Commercial);
//! # }
//! ```

pub mod config;
pub mod error;
pub mod types;

mod classifier;
mod explain;

pub use crate::classifier::{
    build_classifier, classify_or_fallback, ContentClassifier, DisabledClassifier,
    HuggingFaceZeroShot, KeywordClassifier,
};
pub use crate::config::{ClassifierKind, ClassifyConfig};
pub use crate::error::ClassifyError;
pub use crate::explain::{
    build_explainer, build_explanation_prompt, explain_or_empty, Explainer, HuggingFaceExplainer,
    MAX_EXPLANATION_CHARS,
};
pub use crate::types::{Classification, ClassificationSource, UsageLabel};
