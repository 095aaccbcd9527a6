use serde::{Deserialize, Serialize};
use std::fmt;

/// Why an embedding could not be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    /// Embeddings are switched off in configuration.
    Disabled,
    /// The backend failed to load; the failure is cached for the engine's lifetime.
    BackendLoad,
    /// The backend loaded but this call failed, timed out, or returned garbage.
    Inference,
    /// The image bytes could not be decoded.
    Decode,
}

impl UnavailableReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnavailableReason::Disabled => "disabled",
            UnavailableReason::BackendLoad => "backend_load",
            UnavailableReason::Inference => "inference",
            UnavailableReason::Decode => "decode",
        }
    }
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`crate::EmbeddingEngine::compute_embedding`].
///
/// `Unavailable` is an expected outcome, not an error: callers score
/// without the embedding signal and report it as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Embedding {
    /// L2-normalized feature vector.
    Vector(Vec<f32>),
    Unavailable(UnavailableReason),
}

impl Embedding {
    pub fn is_available(&self) -> bool {
        matches!(self, Embedding::Vector(_))
    }

    pub fn as_vector(&self) -> Option<&[f32]> {
        match self {
            Embedding::Vector(v) => Some(v),
            Embedding::Unavailable(_) => None,
        }
    }

    pub fn into_vector(self) -> Option<Vec<f32>> {
        match self {
            Embedding::Vector(v) => Some(v),
            Embedding::Unavailable(_) => None,
        }
    }

    pub fn unavailable_reason(&self) -> Option<UnavailableReason> {
        match self {
            Embedding::Vector(_) => None,
            Embedding::Unavailable(reason) => Some(*reason),
        }
    }

    /// Vector length, 0 when unavailable.
    pub fn dim(&self) -> usize {
        self.as_vector().map_or(0, <[f32]>::len)
    }
}
