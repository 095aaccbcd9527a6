//! Fingerprint type and Hamming-distance similarity.
//!
//! A fingerprint is 64 bits rendered as 16 lowercase hex digits, most
//! significant bit first within each nibble. Comparisons work on the hex
//! text directly so fingerprints read back from JSON or a database need no
//! decoding step.

use serde::{Deserialize, Serialize};

use crate::config::PerceptualError;

/// Number of bits in a fingerprint.
pub const HASH_BITS: u32 = 64;

/// Length of the hex rendering of a fingerprint.
pub const HASH_HEX_LEN: usize = 16;

/// Set-bit count for every nibble value.
const NIBBLE_BITS: [u32; 16] = [0, 1, 1, 2, 1, 2, 2, 3, 1, 2, 2, 3, 2, 3, 3, 4];

/// Immutable 64-bit DCT fingerprint of an image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageFingerprint {
    /// 16 lowercase hex characters.
    hash: String,
    /// Side length of the greyscale grid the hash was computed from.
    grid_size: u32,
}

impl ImageFingerprint {
    pub(crate) fn from_bits(bits: u64, grid_size: u32) -> Self {
        Self {
            hash: format!("{bits:016x}"),
            grid_size,
        }
    }

    /// Parse a fingerprint produced elsewhere (e.g. stored alongside an incident).
    ///
    /// Upper-case digits are accepted and normalized to lower case.
    pub fn from_hex(hash: &str) -> Result<Self, PerceptualError> {
        if hash.len() != HASH_HEX_LEN || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(PerceptualError::InvalidFingerprint {
                hash: hash.to_string(),
            });
        }
        Ok(Self {
            hash: hash.to_ascii_lowercase(),
            grid_size: crate::DEFAULT_GRID_SIZE,
        })
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn grid_size(&self) -> u32 {
        self.grid_size
    }

    /// The fingerprint as an integer, first hex digit in the top nibble.
    pub fn bits(&self) -> u64 {
        // Construction guarantees 16 valid hex digits.
        u64::from_str_radix(&self.hash, 16).unwrap_or_default()
    }

    pub fn hamming_distance(&self, other: &Self) -> u32 {
        hamming_distance(Some(&self.hash), Some(&other.hash))
    }

    /// `1 - hamming / 64`, always in `[0, 1]`.
    pub fn similarity(&self, other: &Self) -> f32 {
        similarity_from_distance(self.hamming_distance(other))
    }
}

impl std::fmt::Display for ImageFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.hash)
    }
}

/// Hamming distance between two hex fingerprints, in `[0, 64]`.
///
/// Missing input, mismatched lengths, or non-hex characters yield the
/// maximum distance: the pair is treated as completely dissimilar.
pub fn hamming_distance(a: Option<&str>, b: Option<&str>) -> u32 {
    let (Some(a), Some(b)) = (a, b) else {
        return HASH_BITS;
    };
    if a.len() != HASH_HEX_LEN || b.len() != HASH_HEX_LEN {
        return HASH_BITS;
    }

    let mut distance = 0;
    for (x, y) in a.chars().zip(b.chars()) {
        let (Some(x), Some(y)) = (x.to_digit(16), y.to_digit(16)) else {
            return HASH_BITS;
        };
        distance += NIBBLE_BITS[(x ^ y) as usize];
    }
    distance
}

/// Perceptual similarity of two optional fingerprints, in `[0, 1]`.
///
/// A missing fingerprint on either side scores 0.
pub fn perceptual_similarity(a: Option<&ImageFingerprint>, b: Option<&ImageFingerprint>) -> f32 {
    similarity_from_distance(hamming_distance(
        a.map(ImageFingerprint::hash),
        b.map(ImageFingerprint::hash),
    ))
}

fn similarity_from_distance(distance: u32) -> f32 {
    1.0 - distance.min(HASH_BITS) as f32 / HASH_BITS as f32
}
