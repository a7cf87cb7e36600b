//! Adaptive mean thresholding into a binary edge mask.
//!
//! Each pixel is compared with the mean of the `block_size`×`block_size`
//! window centred on it. Pixels brighter than `mean - c` become 255
//! (kept); everything else becomes 0, which later paints a black
//! outline. Out-of-image window samples replicate the nearest border
//! pixel, and the mean is rounded to the nearest integer before the
//! comparison.
//!
//! Window sums come from a summed-area table over the border-padded
//! image, so the cost is independent of `block_size`.

use image::{GrayImage, Luma};

use crate::types::{FilterParameters, PipelineError, check_odd_kernel, check_range};

/// Mask value for pixels kept from the color branch.
pub const KEEP: u8 = 255;

/// Mask value for outline pixels.
pub const OUTLINE: u8 = 0;

/// Compute a binary edge mask from a (blurred) grayscale image.
///
/// This is stage 3 of the cartoonizer, between the median blur and
/// compositing.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidParameter`] if `block_size` is even
/// or outside [`FilterParameters::BLOCK_SIZE_RANGE`], or if `c` is
/// outside [`FilterParameters::THRESHOLD_C_RANGE`].
pub fn adaptive_threshold(
    image: &GrayImage,
    block_size: i32,
    c: i32,
) -> Result<GrayImage, PipelineError> {
    check_odd_kernel("block_size", block_size, FilterParameters::BLOCK_SIZE_RANGE)?;
    check_range("threshold_c", c, FilterParameters::THRESHOLD_C_RANGE)?;

    let (w, h) = image.dimensions();
    let mut mask = GrayImage::new(w, h);
    if w == 0 || h == 0 {
        return Ok(mask);
    }

    let radius = (block_size.unsigned_abs() / 2) as usize;
    let table = PaddedIntegral::new(image, radius);
    let side = 2 * radius + 1;
    let area = (side * side) as u64;

    for (x, y, pixel) in mask.enumerate_pixels_mut() {
        let sum = table.window_sum(x as usize, y as usize, side);
        #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
        let mean = ((sum + area / 2) / area) as i32;
        let value = i32::from(image.get_pixel(x, y).0[0]);
        *pixel = Luma([if value - mean + c > 0 { KEEP } else { OUTLINE }]);
    }

    Ok(mask)
}

/// Count pixels marked as outline in an edge mask.
#[must_use]
pub fn count_outline_pixels(mask: &GrayImage) -> u64 {
    mask.pixels()
        .map(|p| u64::from(u8::from(p.0[0] == OUTLINE)))
        .sum()
}

/// Summed-area table over an image padded by `radius` replicated pixels
/// on every side.
struct PaddedIntegral {
    /// Row stride of `sums` (padded width + 1).
    stride: usize,
    /// `sums[y * stride + x]` is the sum of padded pixels in `[0, x) × [0, y)`.
    sums: Vec<u64>,
}

impl PaddedIntegral {
    fn new(image: &GrayImage, radius: usize) -> Self {
        let (w, h) = (image.width() as usize, image.height() as usize);
        let padded_w = w + 2 * radius;
        let padded_h = h + 2 * radius;
        let stride = padded_w + 1;
        let mut sums = vec![0u64; stride * (padded_h + 1)];

        for py in 0..padded_h {
            let sy = py.saturating_sub(radius).min(h - 1);
            let mut row_sum = 0u64;
            for px in 0..padded_w {
                let sx = px.saturating_sub(radius).min(w - 1);
                #[allow(clippy::cast_possible_truncation)]
                let sample = image.get_pixel(sx as u32, sy as u32).0[0];
                row_sum += u64::from(sample);
                sums[(py + 1) * stride + px + 1] = sums[py * stride + px + 1] + row_sum;
            }
        }

        Self { stride, sums }
    }

    /// Sum of the `side`×`side` padded window whose top-left padded
    /// coordinate is `(x, y)`, i.e. centred on image pixel `(x, y)`.
    fn window_sum(&self, x: usize, y: usize, side: usize) -> u64 {
        let at = |cx: usize, cy: usize| self.sums[cy * self.stride + cx];
        at(x + side, y + side) + at(x, y) - at(x, y + side) - at(x + side, y)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]
mod tests {
    use super::*;

    /// Reference implementation with explicit clamped sampling.
    fn naive_threshold(image: &GrayImage, block_size: i32, c: i32) -> GrayImage {
        let r = block_size / 2;
        let (w, h) = image.dimensions();
        let (wi, hi) = (w as i32, h as i32);
        GrayImage::from_fn(w, h, |x, y| {
            let mut sum = 0i64;
            let (xi, yi) = (x as i32, y as i32);
            for dy in -r..=r {
                for dx in -r..=r {
                    let sx = (xi + dx).clamp(0, wi - 1);
                    let sy = (yi + dy).clamp(0, hi - 1);
                    let v = image.get_pixel(sx as u32, sy as u32).0[0];
                    sum += i64::from(v);
                }
            }
            let area = i64::from(block_size * block_size);
            let mean = (sum + area / 2) / area;
            let v = i64::from(image.get_pixel(x, y).0[0]);
            Luma([if v - mean + i64::from(c) > 0 { 255 } else { 0 }])
        })
    }

    fn textured_image() -> GrayImage {
        GrayImage::from_fn(23, 17, |x, y| {
            Luma([((x * 37 + y * 91 + x * y * 13) % 256) as u8])
        })
    }

    #[test]
    fn matches_naive_reference() {
        let img = textured_image();
        for block in [3, 5, 9, 21] {
            for c in [-7, 0, 2, 11] {
                assert_eq!(
                    adaptive_threshold(&img, block, c).unwrap(),
                    naive_threshold(&img, block, c),
                    "block={block} c={c}",
                );
            }
        }
    }

    #[test]
    fn block_larger_than_image_matches_reference() {
        let img = textured_image();
        assert_eq!(
            adaptive_threshold(&img, 51, 2).unwrap(),
            naive_threshold(&img, 51, 2),
        );
    }

    #[test]
    fn uniform_image_is_all_kept_with_positive_c() {
        let img = GrayImage::from_pixel(10, 10, Luma([128]));
        let mask = adaptive_threshold(&img, 9, 2).unwrap();
        assert!(mask.pixels().all(|p| p.0[0] == KEEP));
    }

    #[test]
    fn uniform_image_is_all_outline_with_non_positive_c() {
        let img = GrayImage::from_pixel(10, 10, Luma([128]));
        let mask = adaptive_threshold(&img, 9, 0).unwrap();
        assert_eq!(count_outline_pixels(&mask), 100);
    }

    #[test]
    fn dark_line_becomes_outline() {
        let img = GrayImage::from_fn(15, 15, |x, _| {
            if x == 7 { Luma([20]) } else { Luma([200]) }
        });
        let mask = adaptive_threshold(&img, 5, 2).unwrap();
        for y in 0..15 {
            assert_eq!(mask.get_pixel(7, y).0[0], OUTLINE);
            assert_eq!(mask.get_pixel(2, y).0[0], KEEP);
        }
    }

    #[test]
    fn mask_is_binary() {
        let mask = adaptive_threshold(&textured_image(), 7, 3).unwrap();
        assert!(mask.pixels().all(|p| p.0[0] == KEEP || p.0[0] == OUTLINE));
    }

    #[test]
    fn even_block_size_rejected() {
        let result = adaptive_threshold(&textured_image(), 4, 2);
        assert!(matches!(
            result,
            Err(PipelineError::InvalidParameter {
                name: "block_size",
                ..
            })
        ));
    }

    #[test]
    fn block_size_one_rejected() {
        assert!(adaptive_threshold(&textured_image(), 1, 2).is_err());
    }

    #[test]
    fn out_of_range_c_rejected() {
        assert!(matches!(
            adaptive_threshold(&textured_image(), 9, 21),
            Err(PipelineError::InvalidParameter {
                name: "threshold_c",
                ..
            })
        ));
    }

    #[test]
    fn empty_image_yields_empty_mask() {
        let mask = adaptive_threshold(&GrayImage::new(0, 0), 3, 2).unwrap();
        assert_eq!(mask.dimensions(), (0, 0));
    }
}
