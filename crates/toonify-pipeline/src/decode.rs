//! Image decoding into an 8-bit RGB grid.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces a
//! three-channel `RgbImage`. This is the loader that feeds the
//! cartoonizer: raw bytes in, `RgbImage` out.
//!
//! Channel normalization:
//! - an alpha channel is dropped, color samples are kept as stored
//! - grayscale inputs are expanded to three equal channels
//! - 16-bit and float inputs are narrowed to 8 bits per sample

use image::DynamicImage;

use crate::types::{PipelineError, RgbImage};

/// Decode raw image bytes without any channel normalization.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::DecodeFailure`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    Ok(image::load_from_memory(bytes)?)
}

/// Decode raw image bytes into an RGB grid.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::DecodeFailure`] if the image format is
/// unrecognized or the data is corrupt.
pub fn load_image(bytes: &[u8]) -> Result<RgbImage, PipelineError> {
    let image = decode(bytes)?;
    log::debug!(
        "decoded {} bytes as {:?} {}x{}",
        bytes.len(),
        image.color(),
        image.width(),
        image.height(),
    );
    Ok(to_rgb(image))
}

/// Normalize a decoded image to 8-bit RGB, reusing the buffer when it
/// already is.
#[must_use]
pub fn to_rgb(image: DynamicImage) -> RgbImage {
    match image {
        DynamicImage::ImageRgb8(rgb) => rgb,
        other => other.to_rgb8(),
    }
}
