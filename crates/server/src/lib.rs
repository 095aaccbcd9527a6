//! Reverse Image Server - HTTP REST API for reverse-image similarity matching
//!
//! Exposes the [`matcher::ReverseImagePipeline`] over HTTP for the
//! incident-creation workflow: upload a query image with a text query and
//! get back ranked web matches, each scored by perceptual hash and visual
//! embedding and, for strong matches, classified by how the hosting page
//! uses the image.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! - `GET /` - API information
//! - `GET /health` - Liveness check
//! - `GET /ready` - Readiness check, including embedding backend state
//! - `GET /metrics` - Prometheus metrics
//! - `POST /api/v1/reverse-search` - Ranked matches for a query image
//! - `POST /api/v1/fingerprint` - Perceptual fingerprint of an image
//! - `POST /api/v1/compare` - Similarity of two images
//!
//! Images travel as base64 strings (bare or `data:` URLs). Errors use
//! `{"error": {"code": "...", "message": "..."}}`.
//!
//! # Configuration
//!
//! [`ServerConfig::load`] reads `.env`, an optional `server.{toml,yaml}` and
//! `RIMG_SERVER__*` variables. `pipeline_config` points at the pipeline
//! YAML understood by [`reverse_image::ReverseImageConfig`].

pub mod config;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
