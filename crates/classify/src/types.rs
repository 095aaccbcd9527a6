use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse usage category of a page hosting a matched image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UsageLabel {
    Commercial,
    Educational,
    Safe,
}

impl UsageLabel {
    pub const ALL: [UsageLabel; 3] = [
        UsageLabel::Commercial,
        UsageLabel::Educational,
        UsageLabel::Safe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UsageLabel::Commercial => "Commercial",
            UsageLabel::Educational => "Educational",
            UsageLabel::Safe => "Safe",
        }
    }

    /// Map a provider label such as `"commercial use"` onto a category.
    ///
    /// Anything that is neither commercial nor educational counts as safe.
    pub fn from_provider_label(label: &str) -> Self {
        let lower = label.to_ascii_lowercase();
        if lower.contains("commercial") {
            UsageLabel::Commercial
        } else if lower.contains("educational") {
            UsageLabel::Educational
        } else {
            UsageLabel::Safe
        }
    }
}

impl fmt::Display for UsageLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a classification came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    /// A classifier actually looked at the text.
    Model,
    /// The classifier was unavailable; this is the conservative default.
    Fallback,
}

/// Label plus confidence in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: UsageLabel,
    pub score: f32,
    pub source: ClassificationSource,
}

impl Classification {
    /// Score used for the conservative default.
    pub const FALLBACK_SCORE: f32 = 0.5;

    pub fn new(label: UsageLabel, score: f32) -> Self {
        let score = if score.is_finite() {
            score.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            label,
            score,
            source: ClassificationSource::Model,
        }
    }

    /// `Safe` at 0.5: what the pipeline records when it cannot classify.
    pub fn fallback() -> Self {
        Self {
            label: UsageLabel::Safe,
            score: Self::FALLBACK_SCORE,
            source: ClassificationSource::Fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == ClassificationSource::Fallback
    }
}
