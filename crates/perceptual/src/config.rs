//! Configuration and error types for the perceptual hash engine.
//!
//! The hash is a pure function of `(image_bytes, config)`. Nothing in here
//! touches the network, the clock, or the filesystem.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration for DCT fingerprinting and image normalization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PerceptualConfig {
    /// Configuration schema version.
    ///
    /// Any change that can alter a fingerprint for the same input must bump
    /// this so stored fingerprints stay comparable.
    pub version: u32,
    /// Side length of the greyscale grid fed to the DCT.
    pub grid_size: u32,
    /// Side length of the low-frequency block read from the DCT output.
    ///
    /// `block_size * block_size` must equal 64 so the hash fits one `u64`.
    pub block_size: u32,
    /// Bounding box used by [`crate::normalize_image`]. Images are resized to
    /// fit inside `normalize_size x normalize_size` before hashing.
    pub normalize_size: u32,
}

impl PerceptualConfig {
    /// Create a new configuration with the reference defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the DCT grid size. The reference hash uses 32.
    pub fn with_grid_size(mut self, grid_size: u32) -> Self {
        self.grid_size = grid_size;
        self
    }

    /// Set the normalization bounding box. The reference pipeline uses 256.
    pub fn with_normalize_size(mut self, normalize_size: u32) -> Self {
        self.normalize_size = normalize_size;
        self
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), PerceptualError> {
        if self.version < 1 {
            return Err(PerceptualError::InvalidConfigVersion {
                version: self.version,
            });
        }
        if self.block_size.checked_mul(self.block_size) != Some(64) {
            return Err(PerceptualError::InvalidBlockSize {
                block_size: self.block_size,
            });
        }
        if self.grid_size < self.block_size {
            return Err(PerceptualError::InvalidGridSize {
                grid_size: self.grid_size,
                block_size: self.block_size,
            });
        }
        if self.normalize_size == 0 {
            return Err(PerceptualError::InvalidNormalizeSize);
        }
        Ok(())
    }
}

impl Default for PerceptualConfig {
    fn default() -> Self {
        Self {
            version: 1,
            grid_size: 32,
            block_size: 8,
            normalize_size: 256,
        }
    }
}

/// Errors returned by the perceptual hash engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PerceptualError {
    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("failed to encode normalized image: {0}")]
    Encode(String),

    #[error("image has zero width or height")]
    EmptyImage,

    #[error("invalid fingerprint `{hash}`: expected 16 hex characters")]
    InvalidFingerprint { hash: String },

    #[error("invalid config version {version}; expected >= 1")]
    InvalidConfigVersion { version: u32 },

    #[error("invalid config: block_size {block_size} does not yield a 64-bit hash")]
    InvalidBlockSize { block_size: u32 },

    #[error("invalid config: grid_size {grid_size} is smaller than block_size {block_size}")]
    InvalidGridSize { grid_size: u32, block_size: u32 },

    #[error("invalid config: normalize_size must be >= 1")]
    InvalidNormalizeSize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_values() {
        let cfg = PerceptualConfig::default();
        assert_eq!(cfg.version, 1);
        assert_eq!(cfg.grid_size, 32);
        assert_eq!(cfg.block_size, 8);
        assert_eq!(cfg.normalize_size, 256);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn config_builder_chain() {
        let cfg = PerceptualConfig::new()
            .with_grid_size(64)
            .with_normalize_size(512);
        assert_eq!(cfg.grid_size, 64);
        assert_eq!(cfg.normalize_size, 512);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn config_rejects_grid_smaller_than_block() {
        let cfg = PerceptualConfig::new().with_grid_size(4);
        assert!(matches!(
            cfg.validate(),
            Err(PerceptualError::InvalidGridSize {
                grid_size: 4,
                block_size: 8
            })
        ));
    }

    #[test]
    fn config_rejects_non_64_bit_block() {
        let cfg = PerceptualConfig {
            block_size: 16,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(PerceptualError::InvalidBlockSize { block_size: 16 })
        ));
    }

    #[test]
    fn config_rejects_version_zero() {
        let cfg = PerceptualConfig {
            version: 0,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(PerceptualError::InvalidConfigVersion { version: 0 })
        ));
    }

    #[test]
    fn config_serde_roundtrip() {
        let cfg = PerceptualConfig::new().with_normalize_size(128);
        let serialized = serde_json::to_string(&cfg).unwrap();
        let deserialized: PerceptualConfig = serde_json::from_str(&serialized).unwrap();
        assert_eq!(cfg, deserialized);
    }

    #[test]
    fn error_display_mentions_cause() {
        let err = PerceptualError::Decode("unexpected EOF".into());
        assert!(err.to_string().contains("failed to decode image"));
        assert!(err.to_string().contains("unexpected EOF"));
    }
}
