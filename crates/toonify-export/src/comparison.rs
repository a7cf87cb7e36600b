//! Side-by-side comparison: the original on the left, the cartoon on
//! the right, in a single image.

use image::GenericImage;
use toonify_pipeline::{Dimensions, RgbImage};

use crate::ExportError;

/// Place `original` and `cartoon` next to each other.
///
/// The result is twice as wide as either input and equally tall.
///
/// # Errors
///
/// Returns [`ExportError::DimensionMismatch`] if the two images differ
/// in size, and [`ExportError::TooWide`] if the combined width does not
/// fit in a `u32`.
pub fn side_by_side(original: &RgbImage, cartoon: &RgbImage) -> Result<RgbImage, ExportError> {
    let left = Dimensions::of(original);
    let right = Dimensions::of(cartoon);
    if left != right {
        return Err(ExportError::DimensionMismatch { left, right });
    }

    let width = left
        .width
        .checked_mul(2)
        .ok_or(ExportError::TooWide { width: left.width })?;
    let mut canvas = RgbImage::new(width, left.height);
    canvas.copy_from(original, 0, 0)?;
    canvas.copy_from(cartoon, left.width, 0)?;
    Ok(canvas)
}
