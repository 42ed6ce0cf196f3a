//! Image encoding: `DynamicImage` → JPEG or PNG bytes.
//!
//! JPEG has no alpha channel and the `image` encoder rejects RGBA input, so
//! every image is flattened onto white first. pdfium renders onto an opaque
//! white background already; this matters for transparent GIF/PNG/WebP
//! uploads being re-encoded.

use crate::config::PageImageFormat;
use crate::error::ConversionError;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgb, RgbImage};
use std::io::Cursor;
use tracing::debug;

/// Encode a page image in the configured output format.
pub fn encode_page(
    img: &DynamicImage,
    format: PageImageFormat,
    jpeg_quality: u8,
) -> Result<Vec<u8>, ConversionError> {
    let mut buf = Vec::new();
    match format {
        PageImageFormat::Jpeg => {
            let rgb = flatten_onto_white(img);
            let encoder = JpegEncoder::new_with_quality(&mut buf, jpeg_quality);
            rgb.write_with_encoder(encoder)
                .map_err(|e| ConversionError::encode(format!("JPEG encoding failed: {e}")))?;
        }
        PageImageFormat::Png => {
            img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
                .map_err(|e| ConversionError::encode(format!("PNG encoding failed: {e}")))?;
        }
    }
    debug!(
        "Encoded {}x{} → {} bytes {:?}",
        img.width(),
        img.height(),
        buf.len(),
        format
    );
    Ok(buf)
}

fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, px) in rgba.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        let a = u32::from(a);
        let blend = |c: u8| ((u32::from(c) * a + 255 * (255 - a)) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }
    out
}
