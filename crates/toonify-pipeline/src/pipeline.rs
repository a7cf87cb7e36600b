//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! Unlike [`crate::cartoonize`], which runs both branches of the filter
//! chain in parallel and returns only the final image, [`Pipeline`]
//! lets the caller drive execution one step at a time:
//!
//! ```rust
//! # use toonify_pipeline::{FilterParameters, Pipeline, PipelineError};
//! # fn run(png: Vec<u8>) -> Result<(), PipelineError> {
//! let staged = Pipeline::new(png, FilterParameters::default())
//!     .decode()?
//!     .grayscale()?
//!     .median_blur()?
//!     .threshold()?
//!     .smooth()?
//!     .soften()
//!     .composite()?
//!     .boost()
//!     .into_result();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline
//! state (or `Result` for fallible stages), carrying every previously
//! computed intermediate. The stages run the same functions as
//! [`crate::cartoonize`], so the final image is pixel-identical.
//!
//! # Memory
//!
//! Every stage retains the full raster stack. For a 1000×1000 source
//! this is roughly 15 MB pinned until [`Boosted::into_result`]
//! consumes the final stage. Callers that only need the output should
//! prefer [`crate::cartoonize`].

use crate::types::{Dimensions, FilterParameters, GrayImage, PipelineError, RgbImage, StagedResult};

/// Entry point for the incremental pipeline.
pub struct Pipeline;

impl Pipeline {
    /// Start a pipeline over raw, still-encoded image bytes.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(source: Vec<u8>, params: FilterParameters) -> Pending {
        Pending { params, source }
    }

    /// Start a pipeline over an already decoded image.
    pub const fn from_image(original: RgbImage, params: FilterParameters) -> Decoded {
        Decoded { params, original }
    }
}

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
#[must_use = "pipeline stages are consumed by advancing; call .decode() to continue"]
pub struct Pending {
    params: FilterParameters,
    source: Vec<u8>,
}

impl Pending {
    /// The raw source image bytes.
    #[must_use]
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Decode the source image and advance to the [`Decoded`] stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyInput`] if the source bytes are
    /// empty. Returns [`PipelineError::DecodeFailure`] if the image
    /// format is unrecognized or the data is corrupt.
    pub fn decode(self) -> Result<Decoded, PipelineError> {
        let original = crate::decode::load_image(&self.source)?;
        Ok(Decoded {
            params: self.params,
            original,
        })
    }
}

// ───────────────────────── Stage 1: Decoded ──────────────────────────

/// Pipeline state after decoding the source image to RGB.
#[must_use = "pipeline stages are consumed by advancing; call .grayscale() to continue"]
pub struct Decoded {
    params: FilterParameters,
    original: RgbImage,
}

impl Decoded {
    /// The decoded RGB image.
    #[must_use]
    pub const fn original(&self) -> &RgbImage {
        &self.original
    }

    /// Advance to the grayscale stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnsupportedImage`] if the decoded image
    /// has no pixels.
    pub fn grayscale(self) -> Result<Grayscale, PipelineError> {
        crate::ensure_non_empty(&self.original)?;
        let gray = crate::grayscale::to_grayscale(&self.original);
        let dimensions = Dimensions::of(&gray);
        Ok(Grayscale {
            params: self.params,
            original: self.original,
            gray,
            dimensions,
        })
    }
}

// ───────────────────────── Stage 2: Grayscale ────────────────────────

/// Pipeline state after luma conversion.
#[must_use = "pipeline stages are consumed by advancing; call .median_blur() to continue"]
pub struct Grayscale {
    params: FilterParameters,
    original: RgbImage,
    gray: GrayImage,
    dimensions: Dimensions,
}

impl Grayscale {
    /// The grayscale image.
    #[must_use]
    pub const fn grayscale(&self) -> &GrayImage {
        &self.gray
    }

    /// Advance to the median blur stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidParameter`] if `median_kernel`
    /// is even or out of range.
    pub fn median_blur(self) -> Result<MedianBlurred, PipelineError> {
        let blurred = crate::blur::median_blur(&self.gray, self.params.median_kernel)?;
        Ok(MedianBlurred {
            params: self.params,
            original: self.original,
            gray: self.gray,
            blurred,
            dimensions: self.dimensions,
        })
    }
}

// ───────────────────────── Stage 3: MedianBlurred ────────────────────

/// Pipeline state after median blur.
#[must_use = "pipeline stages are consumed by advancing; call .threshold() to continue"]
pub struct MedianBlurred {
    params: FilterParameters,
    original: RgbImage,
    gray: GrayImage,
    blurred: GrayImage,
    dimensions: Dimensions,
}

impl MedianBlurred {
    /// The median-blurred grayscale image.
    #[must_use]
    pub const fn blurred(&self) -> &GrayImage {
        &self.blurred
    }

    /// Advance to the adaptive threshold stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidParameter`] if `block_size` is
    /// even or out of range, or `threshold_c` is out of range.
    pub fn threshold(self) -> Result<Thresholded, PipelineError> {
        let edges = crate::threshold::adaptive_threshold(
            &self.blurred,
            self.params.block_size,
            self.params.threshold_c,
        )?;
        Ok(Thresholded {
            params: self.params,
            original: self.original,
            gray: self.gray,
            blurred: self.blurred,
            edges,
            dimensions: self.dimensions,
        })
    }
}

// ───────────────────────── Stage 4: Thresholded ──────────────────────

/// Pipeline state after the edge mask is computed.
#[must_use = "pipeline stages are consumed by advancing; call .smooth() to continue"]
pub struct Thresholded {
    params: FilterParameters,
    original: RgbImage,
    gray: GrayImage,
    blurred: GrayImage,
    edges: GrayImage,
    dimensions: Dimensions,
}

impl Thresholded {
    /// The binary edge mask.
    #[must_use]
    pub const fn edges(&self) -> &GrayImage {
        &self.edges
    }

    /// Advance to the bilateral smoothing stage.
    ///
    /// Smoothing reads the original RGB image, not any grayscale
    /// intermediate.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidParameter`] if `diameter`,
    /// `sigma_color`, or `sigma_space` is out of range.
    pub fn smooth(self) -> Result<Smoothed, PipelineError> {
        let smoothed = crate::bilateral::bilateral_smooth(
            &self.original,
            self.params.diameter,
            self.params.sigma_color,
            self.params.sigma_space,
        )?;
        Ok(Smoothed {
            params: self.params,
            original: self.original,
            gray: self.gray,
            blurred: self.blurred,
            edges: self.edges,
            smoothed,
            dimensions: self.dimensions,
        })
    }
}

// ───────────────────────── Stage 5: Smoothed ─────────────────────────

/// Pipeline state after bilateral smoothing.
#[must_use = "pipeline stages are consumed by advancing; call .soften() to continue"]
pub struct Smoothed {
    params: FilterParameters,
    original: RgbImage,
    gray: GrayImage,
    blurred: GrayImage,
    edges: GrayImage,
    smoothed: RgbImage,
    dimensions: Dimensions,
}

impl Smoothed {
    /// The bilateral-filtered color image.
    #[must_use]
    pub const fn smoothed(&self) -> &RgbImage {
        &self.smoothed
    }

    /// Advance to the soft-edge stage.
    ///
    /// When `soft_edges` is `false`, this is a no-op pass-through.
    pub fn soften(self) -> Softened {
        let softened = self
            .params
            .soft_edges
            .then(|| crate::soften::soften(&self.smoothed));
        Softened {
            params: self.params,
            original: self.original,
            gray: self.gray,
            blurred: self.blurred,
            edges: self.edges,
            smoothed: self.smoothed,
            softened,
            dimensions: self.dimensions,
        }
    }
}

// ───────────────────────── Stage 6: Softened ─────────────────────────

/// Pipeline state after the optional soft-edge pass.
#[must_use = "pipeline stages are consumed by advancing; call .composite() to continue"]
pub struct Softened {
    params: FilterParameters,
    original: RgbImage,
    gray: GrayImage,
    blurred: GrayImage,
    edges: GrayImage,
    smoothed: RgbImage,
    softened: Option<RgbImage>,
    dimensions: Dimensions,
}

impl Softened {
    /// The softened image, or `None` if the pass was disabled.
    #[must_use]
    pub const fn softened(&self) -> Option<&RgbImage> {
        self.softened.as_ref()
    }

    /// The color layer that will be masked: softened if enabled,
    /// otherwise the bilateral output.
    #[must_use]
    pub fn color(&self) -> &RgbImage {
        self.softened.as_ref().unwrap_or(&self.smoothed)
    }

    /// Advance to the compositing stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnsupportedImage`] if the color layer
    /// and edge mask differ in size.
    pub fn composite(self) -> Result<Composited, PipelineError> {
        let composited = crate::composite::apply_edge_mask(self.color(), &self.edges)?;
        Ok(Composited {
            params: self.params,
            original: self.original,
            gray: self.gray,
            blurred: self.blurred,
            edges: self.edges,
            smoothed: self.smoothed,
            softened: self.softened,
            composited,
            dimensions: self.dimensions,
        })
    }
}

// ───────────────────────── Stage 7: Composited ───────────────────────

/// Pipeline state after masking the color layer with the edge mask.
#[must_use = "pipeline stages are consumed by advancing; call .boost() to continue"]
pub struct Composited {
    params: FilterParameters,
    original: RgbImage,
    gray: GrayImage,
    blurred: GrayImage,
    edges: GrayImage,
    smoothed: RgbImage,
    softened: Option<RgbImage>,
    composited: RgbImage,
    dimensions: Dimensions,
}

impl Composited {
    /// The composited image.
    #[must_use]
    pub const fn composited(&self) -> &RgbImage {
        &self.composited
    }

    /// Advance to the color boost stage, the final pipeline step.
    ///
    /// When `boost_color` is `false`, this is a no-op pass-through.
    pub fn boost(self) -> Boosted {
        let boosted = self
            .params
            .boost_color
            .then(|| crate::saturation::boost_color(&self.composited));
        Boosted {
            original: self.original,
            gray: self.gray,
            blurred: self.blurred,
            edges: self.edges,
            smoothed: self.smoothed,
            softened: self.softened,
            composited: self.composited,
            boosted,
            dimensions: self.dimensions,
        }
    }
}

// ───────────────────────── Stage 8: Boosted ──────────────────────────

/// Pipeline state after the optional color boost, the final stage.
#[must_use = "call .into_result() to extract the StagedResult"]
pub struct Boosted {
    original: RgbImage,
    gray: GrayImage,
    blurred: GrayImage,
    edges: GrayImage,
    smoothed: RgbImage,
    softened: Option<RgbImage>,
    composited: RgbImage,
    boosted: Option<RgbImage>,
    dimensions: Dimensions,
}

impl Boosted {
    /// The final output image.
    #[must_use]
    pub fn output(&self) -> &RgbImage {
        self.boosted.as_ref().unwrap_or(&self.composited)
    }

    /// Image dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Consume the pipeline and return the full [`StagedResult`].
    #[must_use]
    pub fn into_result(self) -> StagedResult {
        StagedResult {
            original: self.original,
            grayscale: self.gray,
            blurred: self.blurred,
            edges: self.edges,
            smoothed: self.smoothed,
            softened: self.softened,
            composited: self.composited,
            boosted: self.boosted,
            dimensions: self.dimensions,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::cast_possible_truncation)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x * 9 % 256) as u8, (y * 13 % 256) as u8, ((x + y) * 5 % 256) as u8])
        })
    }

    fn run(original: RgbImage, params: FilterParameters) -> StagedResult {
        Pipeline::from_image(original, params)
            .grayscale()
            .unwrap()
            .median_blur()
            .unwrap()
            .threshold()
            .unwrap()
            .smooth()
            .unwrap()
            .soften()
            .composite()
            .unwrap()
            .boost()
            .into_result()
    }

    #[test]
    fn staged_matches_direct() {
        for (boost_color, soft_edges) in [(false, false), (true, false), (false, true), (true, true)] {
            let params = FilterParameters {
                boost_color,
                soft_edges,
                ..FilterParameters::default()
            };
            let img = gradient(24, 18);
            let staged = run(img.clone(), params);
            let direct = crate::cartoonize(&img, &params).unwrap();
            assert_eq!(staged.final_image(), &direct, "boost={boost_color} soft={soft_edges}");
        }
    }

    #[test]
    fn optional_stages_present_only_when_enabled() {
        let img = gradient(10, 10);
        let plain = run(img.clone(), FilterParameters::default());
        assert!(plain.softened.is_none());
        assert!(plain.boosted.is_none());

        let all = run(
            img,
            FilterParameters {
                boost_color: true,
                soft_edges: true,
                ..FilterParameters::default()
            },
        );
        assert!(all.softened.is_some());
        assert!(all.boosted.is_some());
    }

    #[test]
    fn intermediates_share_dimensions() {
        let staged = run(gradient(13, 7), FilterParameters::default());
        let dims = (13, 7);
        assert_eq!(staged.original.dimensions(), dims);
        assert_eq!(staged.grayscale.dimensions(), dims);
        assert_eq!(staged.blurred.dimensions(), dims);
        assert_eq!(staged.edges.dimensions(), dims);
        assert_eq!(staged.smoothed.dimensions(), dims);
        assert_eq!(staged.composited.dimensions(), dims);
        assert_eq!(
            staged.dimensions,
            Dimensions {
                width: 13,
                height: 7
            }
        );
    }

    #[test]
    fn invalid_kernel_fails_at_median_stage() {
        let params = FilterParameters {
            median_kernel: 4,
            ..FilterParameters::default()
        };
        let gray = Pipeline::from_image(gradient(5, 5), params).grayscale().unwrap();
        assert!(matches!(
            gray.median_blur(),
            Err(PipelineError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn empty_image_unsupported() {
        let result = Pipeline::from_image(RgbImage::new(0, 0), FilterParameters::default()).grayscale();
        assert!(matches!(result, Err(PipelineError::UnsupportedImage(_))));
    }

    #[test]
    fn corrupt_source_fails_to_decode() {
        let result = Pipeline::new(vec![0, 1, 2], FilterParameters::default()).decode();
        assert!(matches!(result, Err(PipelineError::DecodeFailure(_))));
    }
}
