//! Edge-mask compositing.
//!
//! Keeps the smoothed color wherever the edge mask is non-zero and
//! paints black wherever it is zero, so the thresholded outlines are
//! drawn over the flat color regions.

use image::{GrayImage, Rgb, RgbImage};

use crate::types::PipelineError;

/// Mask `color` by `mask`, broadcasting the mask across all three
/// channels.
///
/// This is stage 6 of the cartoonizer.
///
/// # Errors
///
/// Returns [`PipelineError::UnsupportedImage`] if the two grids differ
/// in size.
pub fn apply_edge_mask(color: &RgbImage, mask: &GrayImage) -> Result<RgbImage, PipelineError> {
    if color.dimensions() != mask.dimensions() {
        return Err(PipelineError::UnsupportedImage(format!(
            "edge mask is {}x{} but color image is {}x{}",
            mask.width(),
            mask.height(),
            color.width(),
            color.height(),
        )));
    }

    let mut out = color.clone();
    for (pixel, m) in out.pixels_mut().zip(mask.pixels()) {
        if m.0[0] == 0 {
            *pixel = Rgb([0, 0, 0]);
        }
    }
    Ok(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn zero_mask_paints_black() {
        let color = RgbImage::from_pixel(4, 4, Rgb([10, 200, 30]));
        let mask = GrayImage::from_fn(4, 4, |x, _| image::Luma([if x < 2 { 0 } else { 255 }]));
        let out = apply_edge_mask(&color, &mask).unwrap();
        for (x, _, p) in out.enumerate_pixels() {
            if x < 2 {
                assert_eq!(p.0, [0, 0, 0]);
            } else {
                assert_eq!(p.0, [10, 200, 30]);
            }
        }
    }

    #[test]
    fn full_mask_is_identity() {
        let color = RgbImage::from_fn(5, 3, |x, y| {
            Rgb([u8::try_from(x * 50).unwrap_or(255), u8::try_from(y * 80).unwrap_or(255), 7])
        });
        let mask = GrayImage::from_pixel(5, 3, image::Luma([255]));
        assert_eq!(apply_edge_mask(&color, &mask).unwrap(), color);
    }

    #[test]
    fn size_mismatch_rejected() {
        let color = RgbImage::new(4, 4);
        let mask = GrayImage::new(4, 5);
        assert!(matches!(
            apply_edge_mask(&color, &mask),
            Err(PipelineError::UnsupportedImage(_))
        ));
    }
}
