//! Command-line reverse-image search.
//!
//! ```text
//! reverse-image <image-path> <query> [config.yaml]
//! ```
//!
//! Prints the ranked results as JSON on stdout. Logs go to stderr and follow
//! `RUST_LOG` (default `warn`).

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use mimalloc::MiMalloc;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[command(name = "reverse-image")]
#[command(about = "Find visually similar copies of an image on the web", long_about = None)]
#[command(version)]
struct Cli {
    /// Query image (PNG, JPEG, WebP, GIF or BMP).
    image: PathBuf,
    /// Text query sent to the image search provider.
    query: String,
    /// Pipeline YAML. Defaults apply when omitted.
    config: Option<PathBuf>,
    /// Override the number of ranked candidates considered for enrichment.
    #[arg(long)]
    top_k: Option<usize>,
    /// Override the embedding weight in the combined score.
    #[arg(long)]
    embedding_weight: Option<f32>,
    /// Print the full run report (state, transitions, stats) instead of
    /// just the results.
    #[arg(long)]
    report: bool,
    /// Pretty-print JSON.
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let image = std::fs::read(&cli.image)
        .with_context(|| format!("failed to read image {}", cli.image.display()))?;
    let pipeline = reverse_image::load_pipeline(cli.config.as_deref())?;

    let mut config = pipeline.config().clone();
    if let Some(top_k) = cli.top_k {
        config = config.with_top_k(top_k);
    }
    if let Some(weight) = cli.embedding_weight {
        config = config.with_embedding_weight(weight);
    }

    let report = pipeline.run_with_config(&image, &cli.query, &config).await?;

    let output = if cli.report {
        serde_json::to_value(&report)?
    } else {
        serde_json::to_value(&report.results)?
    };
    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{rendered}");

    Ok(())
}
