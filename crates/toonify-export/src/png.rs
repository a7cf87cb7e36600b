//! PNG export.
//!
//! The cartoon is offered for download as a lossless PNG so the flat
//! color regions and hard black outlines survive unchanged.

use image::ImageEncoder;
use image::codecs::png::PngEncoder;
use toonify_pipeline::{Dimensions, RgbImage};

use crate::ExportError;

/// File name suggested when the result is downloaded.
pub const DOWNLOAD_FILE_NAME: &str = "cartoonified.png";

/// MIME type of [`encode_png`] output.
pub const PNG_MIME_TYPE: &str = "image/png";

/// Encode an RGB image as PNG bytes.
///
/// # Errors
///
/// Returns [`ExportError::PngEncode`] if the encoder fails.
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, ExportError> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ExtendedColorType::Rgb8,
    )?;
    log::debug!(
        "encoded {} image as {} PNG bytes",
        Dimensions::of(image),
        buf.len()
    );
    Ok(buf)
}
