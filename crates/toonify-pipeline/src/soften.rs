//! Edge-preserving "soft edges" pass.
//!
//! Implements the recursive-filter variant of the domain transform
//! (Gastal & Oliveira, 2011). The image is smoothed by alternating
//! horizontal and vertical first-order recursive filters whose feedback
//! coefficient shrinks across strong color gradients, so flat regions
//! blur heavily while boundaries stay sharp.
//!
//! The smoothing strength is fixed: [`SIGMA_SPATIAL`] and
//! [`SIGMA_RANGE`] are not user-tunable.

use image::RgbImage;

/// Spatial standard deviation of the filter, in pixels.
pub const SIGMA_SPATIAL: f32 = 64.0;

/// Range standard deviation of the filter, on samples scaled to `[0, 1]`.
pub const SIGMA_RANGE: f32 = 0.2;

/// Number of horizontal+vertical iterations.
const ITERATIONS: i32 = 3;

/// Apply the fixed-strength edge-preserving filter to an RGB image.
///
/// This is the optional stage 5 of the cartoonizer, applied to the
/// bilateral output when `soft_edges` is set.
#[must_use = "returns the softened image"]
pub fn soften(image: &RgbImage) -> RgbImage {
    let (w, h) = (image.width() as usize, image.height() as usize);
    if w == 0 || h == 0 {
        return image.clone();
    }

    let mut planes = Planes::from_rgb(image);
    let ratio = SIGMA_SPATIAL / SIGMA_RANGE;

    // Domain-transform derivatives: 1 + ratio * L1 color difference
    // between neighbors. `dh[y*w + x]` joins (x, y) and (x+1, y);
    // `dv[y*w + x]` joins (x, y) and (x, y+1).
    let mut dh = vec![1.0f32; w * h];
    let mut dv = vec![1.0f32; w * h];
    for y in 0..h {
        for x in 0..w {
            let i = y * w + x;
            if x + 1 < w {
                dh[i] += ratio * planes.l1_distance(i, i + 1);
            }
            if y + 1 < h {
                dv[i] += ratio * planes.l1_distance(i, i + w);
            }
        }
    }

    let norm = (4.0f32.powi(ITERATIONS) - 1.0).sqrt();
    for i in 0..ITERATIONS {
        let sigma_h = SIGMA_SPATIAL * 3.0f32.sqrt() * 2.0f32.powi(ITERATIONS - (i + 1)) / norm;
        let a = (-(2.0f32.sqrt()) / sigma_h).exp();

        let vh: Vec<f32> = dh.iter().map(|&d| a.powf(d)).collect();
        let vv: Vec<f32> = dv.iter().map(|&d| a.powf(d)).collect();

        for plane in &mut planes.channels {
            recursive_pass(plane, &vh, w, h, 1, w);
            recursive_pass(plane, &vv, h, w, w, 1);
        }
    }

    planes.into_rgb(image.width(), image.height())
}

/// Run a causal then anti-causal first-order recursive filter along
/// every line of `plane`.
///
/// Lines have `len` samples spaced `step` apart; consecutive lines
/// start `line_stride` apart. `coeff[i]` is the feedback weight
/// between sample `i` and sample `i + step`.
fn recursive_pass(
    plane: &mut [f32],
    coeff: &[f32],
    len: usize,
    lines: usize,
    step: usize,
    line_stride: usize,
) {
    for line in 0..lines {
        let base = line * line_stride;
        for k in 1..len {
            let cur = base + k * step;
            let prev = cur - step;
            plane[cur] += coeff[prev] * (plane[prev] - plane[cur]);
        }
        for k in (0..len.saturating_sub(1)).rev() {
            let cur = base + k * step;
            let next = cur + step;
            plane[cur] += coeff[cur] * (plane[next] - plane[cur]);
        }
    }
}

/// Planar `[0, 1]` float copy of an RGB image.
struct Planes {
    channels: [Vec<f32>; 3],
}

impl Planes {
    fn from_rgb(image: &RgbImage) -> Self {
        let channels = std::array::from_fn(|c| {
            image
                .pixels()
                .map(|p| f32::from(p.0[c]) / 255.0)
                .collect()
        });
        Self { channels }
    }

    fn l1_distance(&self, a: usize, b: usize) -> f32 {
        self.channels
            .iter()
            .map(|plane| (plane[a] - plane[b]).abs())
            .sum()
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn into_rgb(self, width: u32, height: u32) -> RgbImage {
        let [r, g, b] = self.channels;
        let to_u8 = |v: f32| (v * 255.0).round().clamp(0.0, 255.0) as u8;
        let mut out = RgbImage::new(width, height);
        for (i, pixel) in out.pixels_mut().enumerate() {
            *pixel = image::Rgb([to_u8(r[i]), to_u8(g[i]), to_u8(b[i])]);
        }
        out
    }
}
