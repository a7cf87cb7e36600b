//! toonify-export: Pure output serializers (sans-IO)
//!
//! Turns pipeline output into bytes a caller can save or offer for
//! download. Currently supports PNG and a side-by-side comparison image.

pub mod comparison;
pub mod png;

pub use comparison::side_by_side;
pub use png::{DOWNLOAD_FILE_NAME, PNG_MIME_TYPE, encode_png};

/// Errors raised while serializing pipeline output.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The PNG encoder rejected the image.
    #[error("could not encode PNG: {0}")]
    PngEncode(#[from] image::ImageError),

    /// Two images that must share a size do not.
    #[error("image sizes differ: {left} vs {right}")]
    DimensionMismatch {
        /// Size of the first image.
        left: toonify_pipeline::Dimensions,
        /// Size of the second image.
        right: toonify_pipeline::Dimensions,
    },

    /// A combined image would be wider than an image buffer allows.
    #[error("combined width of two {width}-pixel-wide images overflows")]
    TooWide {
        /// Width of each input image.
        width: u32,
    },
}
