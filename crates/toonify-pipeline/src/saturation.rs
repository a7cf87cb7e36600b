//! Color saturation boost.
//!
//! Pushes every channel away from the pixel's luma by a fixed factor:
//! `out = luma + factor * (c - luma)`, clamped to `[0, 255]` and
//! truncated. Hue is kept and chroma is scaled. Pixels with zero chroma
//! (neutral grays, and the black outlines in particular) are fixed
//! points.

use image::{Rgb, RgbImage};

use crate::grayscale::luma;

/// Multiplicative chroma factor applied when `boost_color` is set.
pub const BOOST_FACTOR: f32 = 1.5;

/// Scale the chroma of one RGB sample by `factor`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn saturate(rgb: [u8; 3], factor: f32) -> [u8; 3] {
    let gray = f32::from(luma(rgb));
    rgb.map(|c| {
        let v = factor.mul_add(f32::from(c) - gray, gray);
        v.clamp(0.0, 255.0) as u8
    })
}

/// Apply [`BOOST_FACTOR`] to every pixel of an image.
///
/// This is the optional stage 7 of the cartoonizer, applied after
/// compositing when `boost_color` is set.
#[must_use = "returns the boosted image"]
pub fn boost_color(image: &RgbImage) -> RgbImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        *pixel = Rgb(saturate(pixel.0, BOOST_FACTOR));
    }
    out
}
