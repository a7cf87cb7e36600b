//! RGB to single-channel luma conversion.
//!
//! Uses the BT.601 weighting `0.299*R + 0.587*G + 0.114*B` in 16-bit
//! fixed point with round-to-nearest. The weights sum to exactly
//! `1 << 16`, so neutral grays map to themselves.

use image::{GrayImage, Luma, RgbImage};

const WEIGHT_R: u32 = 19_595;
const WEIGHT_G: u32 = 38_470;
const WEIGHT_B: u32 = 7_471;
const SHIFT: u32 = 16;
const _: () = assert!(WEIGHT_R + WEIGHT_G + WEIGHT_B == 1 << SHIFT);

/// BT.601 luma of one RGB sample.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn luma([r, g, b]: [u8; 3]) -> u8 {
    let weighted = r as u32 * WEIGHT_R + g as u32 * WEIGHT_G + b as u32 * WEIGHT_B;
    // Max is 255 << 16 plus half an LSB, so the shifted value fits in u8.
    ((weighted + (1 << (SHIFT - 1))) >> SHIFT) as u8
}

/// Convert an RGB image to grayscale.
///
/// This is stage 1 of the cartoonizer, feeding the median blur.
#[must_use = "returns the grayscale image"]
pub fn to_grayscale(image: &RgbImage) -> GrayImage {
    let mut gray = GrayImage::new(image.width(), image.height());
    for (dst, src) in gray.pixels_mut().zip(image.pixels()) {
        *dst = Luma([luma(src.0)]);
    }
    gray
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_grays_map_to_themselves() {
        for v in 0..=255u8 {
            assert_eq!(luma([v, v, v]), v);
        }
    }

    #[test]
    fn green_brightest_blue_darkest() {
        let r = luma([255, 0, 0]);
        let g = luma([0, 255, 0]);
        let b = luma([0, 0, 255]);
        assert!(
            g > r && r > b,
            "expected green > red > blue luminance, got R={r} G={g} B={b}",
        );
    }

    #[test]
    fn known_weights() {
        assert_eq!(luma([255, 0, 0]), 76);
        assert_eq!(luma([0, 255, 0]), 150);
        assert_eq!(luma([0, 0, 255]), 29);
    }

    #[test]
    fn output_dimensions_match_input() {
        let img = RgbImage::new(17, 31);
        let gray = to_grayscale(&img);
        assert_eq!(gray.width(), 17);
        assert_eq!(gray.height(), 31);
    }

    #[test]
    fn converts_every_pixel() {
        let img = RgbImage::from_fn(3, 2, |x, _| {
            if x == 0 {
                image::Rgb([255, 255, 255])
            } else {
                image::Rgb([0, 0, 0])
            }
        });
        let gray = to_grayscale(&img);
        assert_eq!(gray.get_pixel(0, 1).0[0], 255);
        assert_eq!(gray.get_pixel(2, 1).0[0], 0);
    }
}
