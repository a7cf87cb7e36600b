//! Bilateral color smoothing.
//!
//! Flattens color regions into painterly patches while keeping strong
//! boundaries. Each output pixel is the weighted mean of the pixels in
//! a circular window around it. Weights fall off with spatial distance
//! (`sigma_space`) and with the L1 color distance
//! `|dr| + |dg| + |db|` (`sigma_color`). Samples outside the image are
//! mirrored without repeating the edge pixel (`dcb|abcd|cba`).
//!
//! The weighted mean is rounded, so a uniform field comes out exactly
//! as it went in.
//!
//! Operates on the original RGB image, independent of the grayscale
//! edge branch. Rows are filtered in parallel.

use image::RgbImage;
use rayon::prelude::*;

use crate::types::{FilterParameters, PipelineError, check_range};

/// Largest possible L1 distance between two RGB samples.
const MAX_COLOR_DISTANCE: usize = 3 * 255;

/// One tap of the circular window.
#[derive(Debug, Clone, Copy)]
struct Tap {
    dx: i64,
    dy: i64,
    weight: f32,
}

/// Taps with `dx² + dy² <= radius²`, weighted by a spatial Gaussian.
fn spatial_taps(radius: i64, sigma_space: f32) -> Vec<Tap> {
    let coeff = -0.5 / (sigma_space * sigma_space);
    let mut taps = Vec::new();
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let r2 = dx * dx + dy * dy;
            if r2 > radius * radius {
                continue;
            }
            #[allow(clippy::cast_precision_loss)]
            let weight = (r2 as f32 * coeff).exp();
            taps.push(Tap { dx, dy, weight });
        }
    }
    taps
}

/// Gaussian weight for every possible L1 color distance.
fn color_weights(sigma_color: f32) -> Vec<f32> {
    let coeff = -0.5 / (sigma_color * sigma_color);
    (0..=MAX_COLOR_DISTANCE)
        .map(|d| {
            #[allow(clippy::cast_precision_loss)]
            let d = d as f32;
            (d * d * coeff).exp()
        })
        .collect()
}

/// Mirror `i` into `0..n` without repeating the border sample.
const fn reflect101(mut i: i64, n: i64) -> i64 {
    if n == 1 {
        return 0;
    }
    loop {
        if i < 0 {
            i = -i;
        } else if i >= n {
            i = 2 * n - 2 - i;
        } else {
            return i;
        }
    }
}

/// Apply the bilateral filter to an RGB image.
///
/// `diameter` is the window width in pixels; the window radius is
/// `diameter / 2`, so a diameter of 1 returns the image unchanged.
///
/// This is stage 4 of the cartoonizer.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidParameter`] if any argument is
/// outside its [`FilterParameters`] range, and
/// [`PipelineError::UnsupportedImage`] if the image has no pixels.
pub fn bilateral_smooth(
    image: &RgbImage,
    diameter: i32,
    sigma_color: i32,
    sigma_space: i32,
) -> Result<RgbImage, PipelineError> {
    check_range("diameter", diameter, FilterParameters::DIAMETER_RANGE)?;
    check_range("sigma_color", sigma_color, FilterParameters::SIGMA_RANGE)?;
    check_range("sigma_space", sigma_space, FilterParameters::SIGMA_RANGE)?;
    crate::ensure_non_empty(image)?;

    let radius = i64::from(diameter / 2);
    if radius == 0 {
        return Ok(image.clone());
    }

    #[allow(clippy::cast_precision_loss)]
    let (sigma_color, sigma_space) = (sigma_color as f32, sigma_space as f32);
    let taps = spatial_taps(radius, sigma_space);
    let color = color_weights(sigma_color);

    let (width, height) = image.dimensions();
    let src = image.as_raw();
    let mut out = vec![0u8; src.len()];
    out.par_chunks_mut(width as usize * 3)
        .enumerate()
        .for_each(|(y, row)| filter_row(image, y, row, &taps, &color));

    RgbImage::from_raw(width, height, out).ok_or_else(|| {
        PipelineError::UnsupportedImage(format!(
            "bilateral output does not fit {width}x{height}"
        ))
    })
}

/// Filter row `y` of `image` into `row`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]
fn filter_row(image: &RgbImage, y: usize, row: &mut [u8], taps: &[Tap], color: &[f32]) {
    let (w, h) = (i64::from(image.width()), i64::from(image.height()));
    let src = image.as_raw();
    let y = y as i64;
    for (x, px) in (0..w).zip(row.chunks_exact_mut(3)) {
        let center_at = ((y * w + x) * 3) as usize;
        let center = &src[center_at..center_at + 3];
        let mut sum = [0.0f32; 3];
        let mut norm = 0.0f32;
        for tap in taps {
            let sx = reflect101(x + tap.dx, w);
            let sy = reflect101(y + tap.dy, h);
            let at = ((sy * w + sx) * 3) as usize;
            let sample = &src[at..at + 3];
            let distance: usize = sample
                .iter()
                .zip(center)
                .map(|(&a, &b)| usize::from(a.abs_diff(b)))
                .sum();
            let weight = tap.weight * color[distance];
            for (acc, &v) in sum.iter_mut().zip(sample) {
                *acc = weight.mul_add(f32::from(v), *acc);
            }
            norm += weight;
        }
        for (dst, acc) in px.iter_mut().zip(sum) {
            *dst = (acc / norm).round().clamp(0.0, 255.0) as u8;
        }
    }
}
