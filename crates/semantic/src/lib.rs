//! Visual Embeddings
//!
//! This crate turns images into dense, L2-normalized feature vectors and
//! compares them with cosine similarity. It backs the "does this look like
//! the same thing" signal that complements perceptual hashing.
//!
//! We support a few backends:
//!
//! - **ONNX** - run a CLIP-style vision encoder locally (cargo feature `onnx`).
//! - **API** - POST the image to a feature-extraction endpoint.
//! - **Thumbnail** - deterministic pixel embedding. No model, handy for tests
//!   and air-gapped installs.
//!
//! The engine is the only entry point. It loads its backend once, shares it
//! across callers, and never errors: a missing model, a failed HTTP call or
//! an undecodable image all come back as [`Embedding::Unavailable`] with a
//! reason, so callers can tell "not measured" apart from "measured zero".
//!
//! ## Quick example
//!
//! ```no_run
//! use semantic::{cosine_similarity, EmbeddingBackend, EmbeddingEngine, SemanticConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = EmbeddingEngine::new(
//!         SemanticConfig::default().with_backend(EmbeddingBackend::Thumbnail),
//!     );
//!     engine.initialize().await;
//!
//!     let a = engine.compute_embedding(&std::fs::read("a.png").unwrap()).await;
//!     let b = engine.compute_embedding(&std::fs::read("b.png").unwrap()).await;
//!     println!("{}", cosine_similarity(a.as_vector(), b.as_vector()));
//! }
//! ```

pub mod config;
pub mod error;
pub mod types;

mod api;
mod backend;
mod engine;
mod normalize;
#[cfg(feature = "onnx")]
mod onnx;
mod thumbnail;

pub use crate::api::ApiEmbedder;
pub use crate::backend::VisualEmbedder;
pub use crate::config::{EmbeddingBackend, SemanticConfig};
pub use crate::engine::{load_backend, EmbeddingEngine};
pub use crate::error::SemanticError;
pub use crate::normalize::cosine_similarity;
#[cfg(feature = "onnx")]
pub use crate::onnx::OnnxEmbedder;
pub use crate::thumbnail::ThumbnailEmbedder;
pub use crate::types::{Embedding, UnavailableReason};
