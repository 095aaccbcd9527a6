//! # Perceptual Image Fingerprinting
//!
//! This crate computes compact, similarity-preserving fingerprints of images
//! and compares them. Two pictures that look alike (re-encoded, resized,
//! lightly recoloured) produce fingerprints a small Hamming distance apart.
//!
//! ## Contract
//!
//! - The API is a pure function of `(image_bytes, config)`: no network, no
//!   filesystem, no clocks, no global mutable state.
//! - Invariant: for the same bytes and the same [`PerceptualConfig`] the
//!   fingerprint is bit identical.
//!
//! ## Core Pipeline
//!
//! 1.  **Sampling**: the decoded image is stretched to a 32x32 grid and
//!     converted to 8-bit greyscale.
//!
//! 2.  **DCT**: a separable orthonormal DCT-II runs over the rows and then the
//!     columns of the grid.
//!
//! 3.  **Thresholding**: the top-left 8x8 low-frequency block is compared
//!     against the mean of its 63 AC coefficients. Every one of the 64
//!     coefficients, the DC term included, yields one bit (`1` when above
//!     the mean).
//!
//! 4.  **Packing**: the bits are packed row by row into 16 hex digits, most
//!     significant bit first within each nibble.
//!
//! ## Example Usage
//!
//! ```
//! use perceptual::compute_fingerprint;
//! # use image::{DynamicImage, ImageBuffer, ImageFormat, Luma};
//! # let img = ImageBuffer::from_fn(64, 64, |x, y| Luma([((x * 4) ^ (y * 2)) as u8]));
//! # let mut bytes = Vec::new();
//! # DynamicImage::ImageLuma8(img)
//! #     .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
//! #     .unwrap();
//!
//! let a = compute_fingerprint(&bytes).unwrap();
//! let b = compute_fingerprint(&bytes).unwrap();
//!
//! assert_eq!(a.hash().len(), 16);
//! assert_eq!(a.hamming_distance(&b), 0);
//! ```
//!
pub mod config;
mod dct;
pub mod fingerprint;
mod normalize;

use once_cell::sync::Lazy;
use tracing::trace;

pub use crate::config::{PerceptualConfig, PerceptualError};
use crate::dct::DctPlan;
pub use crate::fingerprint::{
    hamming_distance, perceptual_similarity, ImageFingerprint, HASH_BITS, HASH_HEX_LEN,
};
pub use crate::normalize::{decode_image, normalize_image};

/// Human-readable algorithm identifier.
pub const PERCEPTUAL_ALGORITHM: &str = "dct_phash_v1";

/// Grid size used by [`compute_fingerprint`].
pub const DEFAULT_GRID_SIZE: u32 = 32;

/// Bounding box used when normalizing images before hashing.
pub const DEFAULT_NORMALIZE_SIZE: u32 = 256;

static DEFAULT_PLAN: Lazy<DctPlan> = Lazy::new(|| DctPlan::new(DEFAULT_GRID_SIZE as usize));

/// Fingerprint raw image bytes with the default configuration.
pub fn compute_fingerprint(image_bytes: &[u8]) -> Result<ImageFingerprint, PerceptualError> {
    compute_fingerprint_with_config(image_bytes, &PerceptualConfig::default())
}

/// Fingerprint raw image bytes.
///
/// Fails only when the configuration is invalid or the bytes cannot be
/// decoded as an image.
pub fn compute_fingerprint_with_config(
    image_bytes: &[u8],
    cfg: &PerceptualConfig,
) -> Result<ImageFingerprint, PerceptualError> {
    cfg.validate()?;
    let img = decode_image(image_bytes)?;
    Ok(fingerprint_decoded(&img, cfg))
}

/// Fingerprint an already-decoded image. `cfg` must have passed `validate`.
pub(crate) fn fingerprint_decoded(
    img: &image::DynamicImage,
    cfg: &PerceptualConfig,
) -> ImageFingerprint {
    let grid = normalize::greyscale_grid(img, cfg.grid_size);

    let custom_plan;
    let plan: &DctPlan = if cfg.grid_size == DEFAULT_GRID_SIZE {
        &DEFAULT_PLAN
    } else {
        custom_plan = DctPlan::new(cfg.grid_size as usize);
        &custom_plan
    };

    let coefficients = plan.transform_2d(&grid);
    let bits = threshold_low_frequencies(&coefficients, plan.size(), cfg.block_size as usize);
    trace!(
        width = img.width(),
        height = img.height(),
        bits = format_args!("{bits:016x}"),
        "perceptual_fingerprint"
    );
    ImageFingerprint::from_bits(bits, cfg.grid_size)
}

/// Turn the top-left `block x block` coefficients into a bit pattern.
///
/// Bit `i` (counting from the most significant end) is coefficient
/// `(i / block, i % block)`.
fn threshold_low_frequencies(coefficients: &[f64], grid: usize, block: usize) -> u64 {
    let low: Vec<f64> = (0..block)
        .flat_map(|u| (0..block).map(move |v| coefficients[u * grid + v]))
        .collect();

    // The DC term is left out of the mean but still gets a bit of its own.
    let ac_mean = low[1..].iter().sum::<f64>() / (low.len() - 1) as f64;

    let last = low.len() - 1;
    let mut bits = 0u64;
    for (i, coeff) in low.iter().enumerate() {
        if *coeff > ac_mean {
            bits |= 1u64 << (last - i);
        }
    }
    bits
}

/// Normalize and then fingerprint, the way candidate images are scored.
pub fn fingerprint_normalized(
    image_bytes: &[u8],
    cfg: &PerceptualConfig,
) -> Result<ImageFingerprint, PerceptualError> {
    cfg.validate()?;
    let normalized = normalize_image(image_bytes, cfg.normalize_size)?;
    let img = decode_image(&normalized)?;
    Ok(fingerprint_decoded(&img, cfg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageBuffer, ImageFormat, Luma, Rgb};
    use std::io::Cursor;

    fn encode(img: DynamicImage) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn pattern(width: u32, height: u32, offset: u8) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            let fx = x as f64 / width as f64;
            let fy = y as f64 / height as f64;
            let v = 100.0
                + 60.0 * (fx * 6.0).sin() * (fy * 4.0).cos()
                + 30.0 * ((fx + fy) * 3.0).sin();
            Luma([(v as u8).saturating_add(offset)])
        });
        encode(DynamicImage::ImageLuma8(img))
    }

    fn noise(seed: u64, size: u32) -> Vec<u8> {
        let mut rng = fastrand::Rng::with_seed(seed);
        let img = ImageBuffer::from_fn(size, size, |_, _| {
            Rgb([rng.u8(..), rng.u8(..), rng.u8(..)])
        });
        encode(DynamicImage::ImageRgb8(img))
    }

    #[test]
    fn fingerprint_is_sixteen_lower_hex_chars() {
        let fp = compute_fingerprint(&pattern(64, 64, 0)).unwrap();
        assert_eq!(fp.hash().len(), HASH_HEX_LEN);
        assert!(fp
            .hash()
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        assert_eq!(fp.grid_size(), DEFAULT_GRID_SIZE);
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let bytes = noise(7, 48);
        let a = compute_fingerprint(&bytes).unwrap();
        let b = compute_fingerprint(&bytes).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.hamming_distance(&b), 0);
    }

    #[test]
    fn undecodable_bytes_fail() {
        let err = compute_fingerprint(&[0x89, 0x50, 0x4e, 0x47]).unwrap_err();
        assert!(matches!(err, PerceptualError::Decode(_)));
    }

    #[test]
    fn invalid_config_is_rejected_before_decoding() {
        let cfg = PerceptualConfig::new().with_grid_size(2);
        let err = compute_fingerprint_with_config(b"junk", &cfg).unwrap_err();
        assert!(matches!(err, PerceptualError::InvalidGridSize { .. }));
    }

    #[test]
    fn uniform_brightness_shift_keeps_fingerprint_close() {
        let a = compute_fingerprint(&pattern(64, 64, 0)).unwrap();
        let b = compute_fingerprint(&pattern(64, 64, 10)).unwrap();
        assert!(a.hamming_distance(&b) <= 6, "distance {}", a.hamming_distance(&b));
    }

    #[test]
    fn random_noise_images_land_near_half_distance() {
        let mut total = 0;
        for seed in 0..8 {
            let a = compute_fingerprint(&noise(seed, 32)).unwrap();
            let b = compute_fingerprint(&noise(seed + 100, 32)).unwrap();
            let d = a.hamming_distance(&b);
            assert!((8..=56).contains(&d), "seed {seed}: distance {d}");
            total += d;
        }
        let mean = total as f64 / 8.0;
        assert!((20.0..=44.0).contains(&mean), "mean distance {mean}");
    }

    #[test]
    fn dc_bit_is_set_for_bright_images() {
        // With a positive mean intensity the DC coefficient dwarfs the AC mean.
        let fp = compute_fingerprint(&noise(3, 32)).unwrap();
        assert_eq!(fp.bits() >> 63, 1);
    }

    #[test]
    fn threshold_orders_bits_row_major() {
        let grid = 8;
        let mut coefficients = vec![0.0; grid * grid];
        // Only coefficient (0, 1) is above the (tiny positive) mean.
        coefficients[1] = 63.0;
        let bits = threshold_low_frequencies(&coefficients, grid, 8);
        assert_eq!(bits, 1u64 << 62);
    }

    #[test]
    fn custom_grid_size_produces_valid_fingerprint() {
        let cfg = PerceptualConfig::new().with_grid_size(16);
        let fp = compute_fingerprint_with_config(&pattern(64, 64, 0), &cfg).unwrap();
        assert_eq!(fp.hash().len(), 16);
        assert_eq!(fp.grid_size(), 16);
    }

    #[test]
    fn normalized_fingerprint_survives_rescaling() {
        let cfg = PerceptualConfig::default();
        let small = fingerprint_normalized(&pattern(120, 80, 0), &cfg).unwrap();
        let large = fingerprint_normalized(&pattern(600, 400, 0), &cfg).unwrap();
        let d = small.hamming_distance(&large);
        assert!(d <= 16, "distance {d}");
    }

    #[test]
    fn identical_source_normalized_twice_matches_exactly() {
        let bytes = pattern(500, 300, 0);
        let cfg = PerceptualConfig::default();
        let a = fingerprint_normalized(&bytes, &cfg).unwrap();
        let b = fingerprint_normalized(&bytes, &cfg).unwrap();
        assert_eq!(a.hamming_distance(&b), 0);
        assert_eq!(a.similarity(&b), 1.0);
    }
}
