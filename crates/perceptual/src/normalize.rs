//! Image decoding, grid sampling and size normalization.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

use crate::config::PerceptualError;

/// Decode raw bytes in any enabled format, rejecting degenerate images.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, PerceptualError> {
    let img = image::load_from_memory(bytes).map_err(|e| PerceptualError::Decode(e.to_string()))?;
    if img.width() == 0 || img.height() == 0 {
        return Err(PerceptualError::EmptyImage);
    }
    Ok(img)
}

/// Stretch the image to an exact `size x size` greyscale grid and return
/// the 8-bit intensities in row-major order as `f64`.
pub(crate) fn greyscale_grid(img: &DynamicImage, size: u32) -> Vec<f64> {
    img.resize_exact(size, size, FilterType::Triangle)
        .to_luma8()
        .into_raw()
        .into_iter()
        .map(f64::from)
        .collect()
}

/// Resize an image to fit inside `size x size` (aspect ratio preserved) and
/// re-encode it as PNG.
///
/// Candidates arrive at arbitrary resolutions and encodings; hashing the
/// normalized form keeps fingerprints of the same picture aligned.
pub fn normalize_image(bytes: &[u8], size: u32) -> Result<Vec<u8>, PerceptualError> {
    if size == 0 {
        return Err(PerceptualError::InvalidNormalizeSize);
    }
    let img = decode_image(bytes)?;
    let resized = img.resize(size, size, FilterType::Triangle);

    // PNG cannot carry every in-memory pixel layout (e.g. f32), so settle on RGBA8.
    let rgba = DynamicImage::ImageRgba8(resized.to_rgba8());

    let mut out = Vec::new();
    rgba.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .map_err(|e| PerceptualError::Encode(e.to_string()))?;
    Ok(out)
}
