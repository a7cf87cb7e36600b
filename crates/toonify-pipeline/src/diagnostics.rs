//! Pipeline diagnostics: timing, counts, and other metrics for each stage.
//!
//! These diagnostics are permanent instrumentation intended for
//! parameter experimentation. [`process_with_diagnostics`] drives the
//! staged [`Pipeline`] and records how long each stage took through a
//! caller-supplied [`Clock`], so the crate itself stays free of any
//! particular time source. [`SystemClock`] is the default clock, backed
//! by the `web-time` crate (`performance.now()` on WASM,
//! `std::time::Instant` on native).
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::DecodeCache;
use crate::pipeline::Pipeline;
use crate::types::{FilterParameters, PipelineError, StagedResult};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Source of timestamps for stage timing.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// [`Clock`] backed by [`web_time::Instant`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Instant = web_time::Instant;

    fn now(&self) -> web_time::Instant {
        web_time::Instant::now()
    }

    fn elapsed(&self, since: &web_time::Instant) -> Duration {
        since.elapsed()
    }
}

/// Diagnostics collected from a single pipeline run.
///
/// Stages that are conditionally skipped (soft edges, color boost) have
/// `Option` fields that are `None` when the stage was not executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Stage 0: image decoding.
    pub decode: StageDiagnostics,
    /// Stage 1: grayscale conversion.
    pub grayscale: StageDiagnostics,
    /// Stage 2: median blur.
    pub median_blur: StageDiagnostics,
    /// Stage 3: adaptive thresholding.
    pub threshold: StageDiagnostics,
    /// Stage 4: bilateral smoothing.
    pub bilateral: StageDiagnostics,
    /// Stage 5: soft edges (only when `soft_edges == true`).
    pub soften: Option<StageDiagnostics>,
    /// Stage 6: edge-mask compositing.
    pub composite: StageDiagnostics,
    /// Stage 7: color boost (only when `boost_color == true`).
    pub boost: Option<StageDiagnostics>,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Image decoding metrics.
    Decode {
        /// Size of the input image bytes.
        input_bytes: usize,
        /// Decoded image width in pixels.
        width: u32,
        /// Decoded image height in pixels.
        height: u32,
        /// Total pixel count (`width * height`).
        pixel_count: u64,
        /// Whether the grid came from a [`DecodeCache`] without decoding.
        #[serde(default)]
        from_cache: bool,
    },
    /// Grayscale conversion metrics.
    Grayscale {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
    },
    /// Median blur metrics.
    MedianBlur {
        /// Window side in pixels.
        kernel: i32,
    },
    /// Adaptive threshold metrics.
    Threshold {
        /// Neighborhood side in pixels.
        block_size: i32,
        /// Constant subtracted from the neighborhood mean.
        c: i32,
        /// Number of outline pixels (value == 0) in the mask.
        outline_pixel_count: u64,
        /// Total pixel count for computing outline density.
        total_pixel_count: u64,
    },
    /// Bilateral smoothing metrics.
    Bilateral {
        /// Window diameter in pixels.
        diameter: i32,
        /// Color sigma.
        sigma_color: i32,
        /// Spatial sigma.
        sigma_space: i32,
    },
    /// Soft-edge pass metrics.
    Soften {
        /// Fixed spatial sigma.
        sigma_spatial: f32,
        /// Fixed range sigma.
        sigma_range: f32,
    },
    /// Compositing metrics.
    Composite {
        /// Number of pure black pixels in the composited image.
        black_pixel_count: u64,
    },
    /// Color boost metrics.
    Boost {
        /// Chroma scale factor.
        factor: f32,
    },
}

/// High-level summary counts for the entire pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Source image width in pixels.
    pub image_width: u32,
    /// Source image height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Outline pixels in the edge mask.
    pub outline_pixel_count: u64,
}

impl PipelineDiagnostics {
    /// Per-stage diagnostics in pipeline order, skipping stages that
    /// did not run.
    #[must_use]
    pub fn stages(&self) -> Vec<(&'static str, &StageDiagnostics)> {
        let mut stages = vec![
            ("Decode", &self.decode),
            ("Grayscale", &self.grayscale),
            ("Median Blur", &self.median_blur),
            ("Adaptive Threshold", &self.threshold),
            ("Bilateral", &self.bilateral),
        ];
        if let Some(ref soften) = self.soften {
            stages.push(("Soft Edges", soften));
        }
        stages.push(("Composite", &self.composite));
        if let Some(ref boost) = self.boost {
            stages.push(("Color Boost", boost));
        }
        stages
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for (name, diag) in self.stages() {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Outline pixels: {} of {}",
            self.summary.outline_pixel_count, self.summary.pixel_count,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
            from_cache,
            ..
        } => {
            let source = if *from_cache { " (cached)" } else { "" };
            format!("{input_bytes} bytes -> {width}x{height}{source}")
        }
        StageMetrics::Grayscale { width, height } => format!("{width}x{height}"),
        StageMetrics::MedianBlur { kernel } => format!("kernel={kernel}"),
        StageMetrics::Threshold {
            block_size,
            c,
            outline_pixel_count,
            total_pixel_count,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let density = if *total_pixel_count > 0 {
                *outline_pixel_count as f64 / *total_pixel_count as f64 * 100.0
            } else {
                0.0
            };
            format!("block={block_size} C={c} outline={outline_pixel_count} ({density:.1}%)")
        }
        StageMetrics::Bilateral {
            diameter,
            sigma_color,
            sigma_space,
        } => format!("d={diameter} sigma_color={sigma_color} sigma_space={sigma_space}"),
        StageMetrics::Soften {
            sigma_spatial,
            sigma_range,
        } => format!("sigma_s={sigma_spatial:.0} sigma_r={sigma_range:.2}"),
        StageMetrics::Composite { black_pixel_count } => format!("black={black_pixel_count}"),
        StageMetrics::Boost { factor } => format!("x{factor:.2}"),
    }
}

/// Count pure black pixels in an RGB image.
pub(crate) fn count_black_pixels(image: &crate::types::RgbImage) -> u64 {
    image
        .pixels()
        .map(|p| u64::from(u8::from(p.0 == [0, 0, 0])))
        .sum()
}

/// Run the staged pipeline over `image_bytes`, timing every stage.
///
/// # Errors
///
/// Returns the first [`PipelineError`] raised by any stage.
pub fn process_with_diagnostics<C: Clock>(
    image_bytes: &[u8],
    params: &FilterParameters,
    clock: &C,
) -> Result<(StagedResult, PipelineDiagnostics), PipelineError> {
    run_with_diagnostics(image_bytes, params, clock, None)
}

/// Like [`process_with_diagnostics`], but decodes through `cache`, so
/// repeated runs over the same bytes time a cache hit instead of a full
/// decode.
///
/// # Errors
///
/// Returns the first [`PipelineError`] raised by any stage.
pub fn process_cached_with_diagnostics<C: Clock>(
    image_bytes: &[u8],
    params: &FilterParameters,
    clock: &C,
    cache: &mut DecodeCache,
) -> Result<(StagedResult, PipelineDiagnostics), PipelineError> {
    run_with_diagnostics(image_bytes, params, clock, Some(cache))
}

fn run_with_diagnostics<C: Clock>(
    image_bytes: &[u8],
    params: &FilterParameters,
    clock: &C,
    cache: Option<&mut DecodeCache>,
) -> Result<(StagedResult, PipelineDiagnostics), PipelineError> {
    let start = clock.now();

    let t = clock.now();
    let (decoded, from_cache) = match cache {
        Some(cache) => {
            let hits = cache.hits();
            let original = cache.load(image_bytes)?;
            let from_cache = cache.hits() > hits;
            (
                Pipeline::from_image(Arc::unwrap_or_clone(original), *params),
                from_cache,
            )
        }
        None => (Pipeline::new(image_bytes.to_vec(), *params).decode()?, false),
    };
    let dims = crate::types::Dimensions::of(decoded.original());
    let decode = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Decode {
            input_bytes: image_bytes.len(),
            width: dims.width,
            height: dims.height,
            pixel_count: dims.pixel_count(),
            from_cache,
        },
    };

    let t = clock.now();
    let gray = decoded.grayscale()?;
    let grayscale = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Grayscale {
            width: dims.width,
            height: dims.height,
        },
    };

    let t = clock.now();
    let blurred = gray.median_blur()?;
    let median_blur = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::MedianBlur {
            kernel: params.median_kernel,
        },
    };

    let t = clock.now();
    let thresholded = blurred.threshold()?;
    let outline_pixel_count = crate::threshold::count_outline_pixels(thresholded.edges());
    let threshold = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Threshold {
            block_size: params.block_size,
            c: params.threshold_c,
            outline_pixel_count,
            total_pixel_count: dims.pixel_count(),
        },
    };

    let t = clock.now();
    let smoothed = thresholded.smooth()?;
    let bilateral = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Bilateral {
            diameter: params.diameter,
            sigma_color: params.sigma_color,
            sigma_space: params.sigma_space,
        },
    };

    let t = clock.now();
    let softened = smoothed.soften();
    let soften = params.soft_edges.then(|| StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Soften {
            sigma_spatial: crate::soften::SIGMA_SPATIAL,
            sigma_range: crate::soften::SIGMA_RANGE,
        },
    });

    let t = clock.now();
    let composited = softened.composite()?;
    let composite = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Composite {
            black_pixel_count: count_black_pixels(composited.composited()),
        },
    };

    let t = clock.now();
    let boosted = composited.boost();
    let boost = params.boost_color.then(|| StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Boost {
            factor: crate::saturation::BOOST_FACTOR,
        },
    });

    let staged = boosted.into_result();
    let diagnostics = PipelineDiagnostics {
        decode,
        grayscale,
        median_blur,
        threshold,
        bilateral,
        soften,
        composite,
        boost,
        total_duration: clock.elapsed(&start),
        summary: PipelineSummary {
            image_width: dims.width,
            image_height: dims.height,
            pixel_count: dims.pixel_count(),
            outline_pixel_count,
        },
    };

    log::debug!("pipeline finished in {:.3}ms", duration_ms(diagnostics.total_duration));
    Ok((staged, diagnostics))
}
