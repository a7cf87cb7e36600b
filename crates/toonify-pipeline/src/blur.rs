//! Median blur for speckle suppression before edge extraction.
//!
//! Wraps [`imageproc::filter::median_filter`], which replicates border
//! pixels. A square window of side `kernel` maps to a radius of
//! `kernel / 2` on both axes.

use image::GrayImage;

use crate::types::{FilterParameters, PipelineError, check_odd_kernel};

/// Apply a square median filter of side `kernel` to a grayscale image.
///
/// `kernel` must be odd and within
/// [`FilterParameters::MEDIAN_KERNEL_RANGE`]. A kernel of 1 returns the
/// image unchanged.
///
/// This is stage 2 of the cartoonizer, between grayscale conversion and
/// adaptive thresholding.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidParameter`] if `kernel` is even or
/// out of range.
pub fn median_blur(image: &GrayImage, kernel: i32) -> Result<GrayImage, PipelineError> {
    check_odd_kernel("median_kernel", kernel, FilterParameters::MEDIAN_KERNEL_RANGE)?;
    let radius = kernel.unsigned_abs() / 2;
    if radius == 0 {
        return Ok(image.clone());
    }

    Ok(imageproc::filter::median_filter(image, radius, radius))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// 9x9 mid-gray image with a single white speck in the center.
    fn speck_image() -> GrayImage {
        GrayImage::from_fn(9, 9, |x, y| {
            if x == 4 && y == 4 {
                image::Luma([255])
            } else {
                image::Luma([100])
            }
        })
    }

    #[test]
    fn kernel_one_is_identity() {
        let img = speck_image();
        assert_eq!(median_blur(&img, 1).unwrap(), img);
    }

    #[test]
    fn even_kernel_rejected() {
        let result = median_blur(&speck_image(), 4);
        assert!(matches!(
            result,
            Err(PipelineError::InvalidParameter {
                name: "median_kernel",
                value: 4,
                ..
            })
        ));
    }

    #[test]
    fn oversized_kernel_rejected() {
        assert!(median_blur(&speck_image(), 17).is_err());
    }

    #[test]
    fn speck_removed() {
        let blurred = median_blur(&speck_image(), 3).unwrap();
        assert_eq!(blurred.get_pixel(4, 4).0[0], 100);
    }

    #[test]
    fn uniform_image_unchanged() {
        let img = GrayImage::from_pixel(12, 7, image::Luma([128]));
        assert_eq!(median_blur(&img, 7).unwrap(), img);
    }

    #[test]
    fn output_dimensions_preserved() {
        let img = GrayImage::new(17, 31);
        let blurred = median_blur(&img, 5).unwrap();
        assert_eq!(blurred.width(), 17);
        assert_eq!(blurred.height(), 31);
    }

    #[test]
    fn straight_edge_survives() {
        // A vertical step is a median fixed point away from the corners.
        let img = GrayImage::from_fn(10, 10, |x, _| {
            if x < 5 {
                image::Luma([0])
            } else {
                image::Luma([255])
            }
        });
        let blurred = median_blur(&img, 3).unwrap();
        assert_eq!(blurred.get_pixel(4, 5).0[0], 0);
        assert_eq!(blurred.get_pixel(5, 5).0[0], 255);
    }
}
