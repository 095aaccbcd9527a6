use perceptual::{perceptual_similarity, ImageFingerprint};
use search::Candidate;
use semantic::cosine_similarity;
use serde::{Deserialize, Serialize};

/// Scores produced by [`combine`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityScores {
    pub combined: f32,
    pub perceptual: f32,
    /// `None` when either side had no embedding.
    pub embedding: Option<f32>,
}

/// Clamp an embedding weight into `[0, 1]`. NaN becomes 0.
pub fn clamp_weight(weight: f32) -> f32 {
    if weight.is_nan() {
        0.0
    } else {
        weight.clamp(0.0, 1.0)
    }
}

/// Merge perceptual and embedding similarity into one score.
///
/// `combined = (1 - w) * perceptual + w * embedding`, where a missing signal
/// contributes 0 to its term. Never fails.
pub fn combine(
    fp_a: Option<&ImageFingerprint>,
    fp_b: Option<&ImageFingerprint>,
    emb_a: Option<&[f32]>,
    emb_b: Option<&[f32]>,
    embedding_weight: f32,
) -> SimilarityScores {
    let w = clamp_weight(embedding_weight);
    let perceptual = perceptual_similarity(fp_a, fp_b);
    let embedding = match (emb_a, emb_b) {
        (Some(a), Some(b)) => Some(cosine_similarity(Some(a), Some(b))),
        _ => None,
    };
    let combined = (1.0 - w) * perceptual + w * embedding.unwrap_or(0.0);
    SimilarityScores {
        combined: combined.clamp(0.0, 1.0),
        perceptual,
        embedding,
    }
}

/// A downloaded, fingerprinted and scored search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    /// Position in the provider's result list.
    pub search_rank: usize,
    pub fingerprint: ImageFingerprint,
    pub scores: SimilarityScores,
}

impl ScoredCandidate {
    pub fn combined(&self) -> f32 {
        self.scores.combined
    }
}

/// Sort by combined similarity, highest first. Ties keep provider order.
pub fn rank(scored: &mut [ScoredCandidate]) {
    // `sort_by` is stable.
    scored.sort_by(|a, b| b.scores.combined.total_cmp(&a.scores.combined));
}
