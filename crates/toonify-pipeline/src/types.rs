//! Shared types for the toonify cartoonizer pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference the
/// grayscale and edge-mask intermediates without depending on `image`
/// directly.
pub use image::GrayImage;

/// Re-export `RgbImage` so downstream crates can reference the decoded
/// input and the cartoonized output without depending on `image`
/// directly.
pub use image::RgbImage;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of an RGB or grayscale raster.
    #[must_use]
    pub fn of<P: image::Pixel>(image: &image::ImageBuffer<P, Vec<P::Subpixel>>) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }

    /// Total pixel count (`width * height`).
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Filter parameters for one cartoonizer invocation.
///
/// The bundle is owned by the caller and passed by reference; the
/// pipeline never mutates it. Values are not clamped inside the
/// pipeline: anything outside the documented domain is rejected by
/// [`validate`](Self::validate) with [`PipelineError::InvalidParameter`].
///
/// Deserializing a partial JSON document fills missing fields from
/// [`FilterParameters::default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterParameters {
    /// Scale chroma by [`crate::saturation::BOOST_FACTOR`] after
    /// compositing.
    pub boost_color: bool,

    /// Run the edge-preserving soft-edge pass on the bilateral output.
    pub soft_edges: bool,

    /// Bilateral filter window diameter in pixels (1 to 25, odd
    /// preferred). The window radius is `diameter / 2`.
    pub diameter: i32,

    /// Bilateral filter color sigma (1 to 300). Larger values mix more
    /// dissimilar colors.
    pub sigma_color: i32,

    /// Bilateral filter spatial sigma (1 to 300).
    pub sigma_space: i32,

    /// Median blur window side before edge extraction (odd, 1 to 15).
    pub median_kernel: i32,

    /// Adaptive threshold neighborhood side (odd, 3 to 51).
    pub block_size: i32,

    /// Constant subtracted from the neighborhood mean (-20 to 20).
    pub threshold_c: i32,
}

impl FilterParameters {
    /// Default for [`boost_color`](Self::boost_color).
    pub const DEFAULT_BOOST_COLOR: bool = false;
    /// Default for [`soft_edges`](Self::soft_edges).
    pub const DEFAULT_SOFT_EDGES: bool = false;
    /// Default for [`diameter`](Self::diameter).
    pub const DEFAULT_DIAMETER: i32 = 9;
    /// Default for [`sigma_color`](Self::sigma_color).
    pub const DEFAULT_SIGMA_COLOR: i32 = 250;
    /// Default for [`sigma_space`](Self::sigma_space).
    pub const DEFAULT_SIGMA_SPACE: i32 = 250;
    /// Default for [`median_kernel`](Self::median_kernel).
    pub const DEFAULT_MEDIAN_KERNEL: i32 = 7;
    /// Default for [`block_size`](Self::block_size).
    pub const DEFAULT_BLOCK_SIZE: i32 = 9;
    /// Default for [`threshold_c`](Self::threshold_c).
    pub const DEFAULT_THRESHOLD_C: i32 = 2;

    /// Inclusive range accepted for [`diameter`](Self::diameter).
    pub const DIAMETER_RANGE: (i32, i32) = (1, 25);
    /// Inclusive range accepted for both bilateral sigmas.
    pub const SIGMA_RANGE: (i32, i32) = (1, 300);
    /// Inclusive range accepted for [`median_kernel`](Self::median_kernel).
    pub const MEDIAN_KERNEL_RANGE: (i32, i32) = (1, 15);
    /// Inclusive range accepted for [`block_size`](Self::block_size).
    pub const BLOCK_SIZE_RANGE: (i32, i32) = (3, 51);
    /// Inclusive range accepted for [`threshold_c`](Self::threshold_c).
    pub const THRESHOLD_C_RANGE: (i32, i32) = (-20, 20);

    /// The defaults table as a constant.
    pub const DEFAULTS: Self = Self {
        boost_color: Self::DEFAULT_BOOST_COLOR,
        soft_edges: Self::DEFAULT_SOFT_EDGES,
        diameter: Self::DEFAULT_DIAMETER,
        sigma_color: Self::DEFAULT_SIGMA_COLOR,
        sigma_space: Self::DEFAULT_SIGMA_SPACE,
        median_kernel: Self::DEFAULT_MEDIAN_KERNEL,
        block_size: Self::DEFAULT_BLOCK_SIZE,
        threshold_c: Self::DEFAULT_THRESHOLD_C,
    };

    /// Check every numeric field against its domain.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidParameter`] for the first field
    /// that is out of range, or even where an odd value is required.
    pub fn validate(&self) -> Result<(), PipelineError> {
        check_range("diameter", self.diameter, Self::DIAMETER_RANGE)?;
        check_range("sigma_color", self.sigma_color, Self::SIGMA_RANGE)?;
        check_range("sigma_space", self.sigma_space, Self::SIGMA_RANGE)?;
        check_odd_kernel("median_kernel", self.median_kernel, Self::MEDIAN_KERNEL_RANGE)?;
        check_odd_kernel("block_size", self.block_size, Self::BLOCK_SIZE_RANGE)?;
        check_range("threshold_c", self.threshold_c, Self::THRESHOLD_C_RANGE)?;
        Ok(())
    }
}

impl Default for FilterParameters {
    fn default() -> Self {
        Self::DEFAULTS
    }
}

/// Reject `value` unless it lies in the inclusive `range`.
pub(crate) fn check_range(
    name: &'static str,
    value: i32,
    (min, max): (i32, i32),
) -> Result<(), PipelineError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(PipelineError::InvalidParameter {
            name,
            value,
            reason: format!("must be between {min} and {max}"),
        })
    }
}

/// Reject `value` unless it is odd and lies in the inclusive `range`.
pub(crate) fn check_odd_kernel(
    name: &'static str,
    value: i32,
    range: (i32, i32),
) -> Result<(), PipelineError> {
    check_range(name, value, range)?;
    if value % 2 == 0 {
        return Err(PipelineError::InvalidParameter {
            name,
            value,
            reason: "must be odd".to_owned(),
        });
    }
    Ok(())
}

/// Result of running the pipeline with every intermediate preserved.
///
/// Each field captures the output of one logical stage so callers can
/// display or inspect the whole chain.
#[derive(Debug, Clone)]
pub struct StagedResult {
    /// Decoded input image.
    pub original: RgbImage,
    /// Stage 1: BT.601 luma.
    pub grayscale: GrayImage,
    /// Stage 2: median-blurred luma.
    pub blurred: GrayImage,
    /// Stage 3: binary edge mask (0 = outline, 255 = keep).
    pub edges: GrayImage,
    /// Stage 4: bilateral-filtered color.
    pub smoothed: RgbImage,
    /// Stage 5: soft-edge pass (`Some` only when `soft_edges=true`).
    pub softened: Option<RgbImage>,
    /// Stage 6: color masked by the edge mask.
    pub composited: RgbImage,
    /// Stage 7: saturation-boosted result (`Some` only when
    /// `boost_color=true`).
    pub boosted: Option<RgbImage>,
    /// Source image dimensions in pixels.
    pub dimensions: Dimensions,
}

impl StagedResult {
    /// Returns the final output: boosted if boosting is enabled,
    /// otherwise the composited image.
    #[must_use]
    pub fn final_image(&self) -> &RgbImage {
        self.boosted.as_ref().unwrap_or(&self.composited)
    }

    /// Consume the result and return only the final output image.
    #[must_use]
    pub fn into_final_image(self) -> RgbImage {
        self.boosted.unwrap_or(self.composited)
    }
}

/// Errors that can occur while loading or cartoonizing an image.
///
/// Every variant is terminal for the current invocation: there is no
/// partial result and nothing is retried or silently repaired.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The input bytes could not be decoded as an image.
    #[error("could not read image: {0}")]
    DecodeFailure(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("could not read image: input is empty")]
    EmptyInput,

    /// A filter parameter reached the pipeline outside its domain.
    #[error("invalid parameter {name}={value}: {reason}")]
    InvalidParameter {
        /// Field name as it appears on [`FilterParameters`].
        name: &'static str,
        /// The rejected value.
        value: i32,
        /// Human-readable constraint that was violated.
        reason: String,
    },

    /// The decoded grid is empty or not 8-bit RGB.
    #[error("unsupported image: {0}")]
    UnsupportedImage(String),
}

impl PipelineError {
    /// Whether this error means the input bytes were unreadable.
    #[must_use]
    pub const fn is_decode_failure(&self) -> bool {
        matches!(self, Self::DecodeFailure(_) | Self::EmptyInput)
    }
}
