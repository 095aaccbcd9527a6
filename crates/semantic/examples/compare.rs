use std::{env, error::Error};

use semantic::{cosine_similarity, Embedding, EmbeddingBackend, EmbeddingEngine, SemanticConfig};

/// Embed two images and print their cosine similarity.
///
/// Usage:
/// ```bash
/// cargo run -p rimg-semantic --example compare -- a.png b.png [onnx|api|thumbnail]
/// ```
///
/// The thumbnail backend is the default here since it needs no model.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let mut args = env::args().skip(1);
    let (Some(a), Some(b)) = (args.next(), args.next()) else {
        eprintln!("usage: compare <image-a> <image-b> [onnx|api|thumbnail]");
        std::process::exit(2);
    };
    let backend = match args.next().as_deref() {
        Some("onnx") => EmbeddingBackend::Onnx,
        Some("api") => EmbeddingBackend::Api,
        _ => EmbeddingBackend::Thumbnail,
    };

    let engine = EmbeddingEngine::new(SemanticConfig::default().with_backend(backend));
    if !engine.initialize().await {
        eprintln!("backend {} is not available", backend.as_str());
    }

    let ea = engine.compute_embedding(&std::fs::read(&a)?).await;
    let eb = engine.compute_embedding(&std::fs::read(&b)?).await;

    for (path, embedding) in [(&a, &ea), (&b, &eb)] {
        match embedding {
            Embedding::Vector(v) => println!("{path}: {} dims", v.len()),
            Embedding::Unavailable(reason) => println!("{path}: unavailable ({reason})"),
        }
    }
    println!(
        "cosine similarity: {:.4}",
        cosine_similarity(ea.as_vector(), eb.as_vector())
    );

    Ok(())
}
