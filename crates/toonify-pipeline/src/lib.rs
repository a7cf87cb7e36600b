//! toonify-pipeline: Pure cartoon filter pipeline (sans-IO).
//!
//! Turns a photograph into a cartoon-style rendering through two
//! independent branches that meet at the end:
//!
//! - edges: grayscale -> median blur -> adaptive threshold (the mask)
//! - color: bilateral smoothing -> optional soft edges
//!
//! The smoothed color is then masked by the edges (outline pixels go
//! black) and optionally saturated.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and image buffers. File handling and PNG export live in
//! `toonify-export` and the `toonify` CLI.

pub mod bilateral;
pub mod blur;
pub mod cache;
pub mod composite;
pub mod decode;
pub mod diagnostics;
pub mod grayscale;
pub mod pipeline;
pub mod saturation;
pub mod soften;
pub mod threshold;
pub mod types;

pub use cache::DecodeCache;
pub use decode::load_image;
pub use diagnostics::{
    Clock, PipelineDiagnostics, SystemClock, process_cached_with_diagnostics,
    process_with_diagnostics,
};
pub use pipeline::Pipeline;
pub use types::{
    Dimensions, FilterParameters, GrayImage, PipelineError, RgbImage, StagedResult,
};

use image::DynamicImage;

/// Reject grids with zero width or height.
pub(crate) fn ensure_non_empty(image: &RgbImage) -> Result<(), PipelineError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(PipelineError::UnsupportedImage(format!(
            "image has no pixels ({}x{})",
            image.width(),
            image.height(),
        )));
    }
    Ok(())
}

/// Apply the cartoon filter to a decoded RGB image.
///
/// # Pipeline steps
///
/// 1. Grayscale (BT.601 luma)
/// 2. Median blur with `median_kernel`
/// 3. Adaptive mean threshold with `block_size` and `threshold_c`
/// 4. Bilateral smoothing with `diameter`, `sigma_color`, `sigma_space`
/// 5. Optional soft edges
/// 6. Edge-mask compositing
/// 7. Optional color boost
///
/// Steps 1-3 and 4-5 do not depend on each other and run in parallel.
/// The output has the same dimensions as the input, and every pixel
/// whose mask value is zero is exactly black (boosting keeps black
/// black).
///
/// # Errors
///
/// Returns [`PipelineError::InvalidParameter`] if any parameter is out
/// of range or a kernel size is even. Returns
/// [`PipelineError::UnsupportedImage`] if the image has no pixels.
pub fn cartoonize(image: &RgbImage, params: &FilterParameters) -> Result<RgbImage, PipelineError> {
    params.validate()?;
    ensure_non_empty(image)?;
    log::debug!(
        "cartoonizing {} image with {params:?}",
        Dimensions::of(image)
    );

    let (edges, color) = rayon::join(
        || -> Result<GrayImage, PipelineError> {
            let gray = grayscale::to_grayscale(image);
            let blurred = blur::median_blur(&gray, params.median_kernel)?;
            threshold::adaptive_threshold(&blurred, params.block_size, params.threshold_c)
        },
        || -> Result<RgbImage, PipelineError> {
            let smoothed = bilateral::bilateral_smooth(
                image,
                params.diameter,
                params.sigma_color,
                params.sigma_space,
            )?;
            Ok(if params.soft_edges {
                soften::soften(&smoothed)
            } else {
                smoothed
            })
        },
    );
    let (edges, color) = (edges?, color?);
    log::debug!(
        "edge mask has {} outline pixels",
        threshold::count_outline_pixels(&edges)
    );

    let composited = composite::apply_edge_mask(&color, &edges)?;
    Ok(if params.boost_color {
        saturation::boost_color(&composited)
    } else {
        composited
    })
}

/// Apply the cartoon filter to a [`DynamicImage`].
///
/// Only 8-bit, three-channel RGB input is accepted here; use
/// [`load_image`] to normalize arbitrary decoded images first.
///
/// # Errors
///
/// Returns [`PipelineError::UnsupportedImage`] for any other pixel
/// layout, plus everything [`cartoonize`] returns.
pub fn cartoonize_dynamic(
    image: &DynamicImage,
    params: &FilterParameters,
) -> Result<RgbImage, PipelineError> {
    match image {
        DynamicImage::ImageRgb8(rgb) => cartoonize(rgb, params),
        other => Err(PipelineError::UnsupportedImage(format!(
            "expected 8-bit RGB, got {:?}",
            other.color()
        ))),
    }
}

/// Decode `image_bytes` and apply the cartoon filter.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `image_bytes` is empty and
/// [`PipelineError::DecodeFailure`] if it is not a readable image,
/// plus everything [`cartoonize`] returns.
pub fn process(image_bytes: &[u8], params: &FilterParameters) -> Result<RgbImage, PipelineError> {
    let image = load_image(image_bytes)?;
    cartoonize(&image, params)
}

/// Decode `image_bytes` and run every stage in order, keeping all
/// intermediate rasters.
///
/// # Errors
///
/// Same as [`process`].
pub fn process_staged(
    image_bytes: &[u8],
    params: &FilterParameters,
) -> Result<StagedResult, PipelineError> {
    params.validate()?;
    Ok(Pipeline::new(image_bytes.to_vec(), *params)
        .decode()?
        .grayscale()?
        .median_blur()?
        .threshold()?
        .smooth()?
        .soften()
        .composite()?
        .boost()
        .into_result())
}
