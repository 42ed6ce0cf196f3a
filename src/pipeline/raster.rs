//! Single raster image → exactly one page.
//!
//! JPEG and PNG are already what downstream extraction consumes, so they pass
//! through byte-for-byte: splitting the same upload twice yields identical
//! bytes. GIF, WebP, BMP and TIFF are decoded (first frame only) and
//! re-encoded in the configured output format.

use crate::config::SplitConfig;
use crate::error::{ConversionError, SplitError};
use crate::pipeline::encode::encode_page;
use crate::pipeline::{limits, PageConverter, RawPage};
use image::ImageFormat;
use std::io::Cursor;
use std::sync::Arc;
use tracing::debug;

/// Converter for [`crate::FormatKind::RasterImage`].
pub struct ImageConverter<'a> {
    config: &'a SplitConfig,
}

impl<'a> ImageConverter<'a> {
    pub fn new(config: &'a SplitConfig) -> Self {
        Self { config }
    }
}

impl PageConverter for ImageConverter<'_> {
    async fn convert(&self, input: Arc<[u8]>) -> Result<Vec<RawPage>, SplitError> {
        let format = self.config.output_format;
        let quality = self.config.jpeg_quality;
        let max_pixels = self.config.max_image_pixels;

        let page = tokio::task::spawn_blocking(move || -> Result<RawPage, SplitError> {
            let reader = image::ImageReader::new(Cursor::new(&input[..]))
                .with_guessed_format()
                .map_err(|e| ConversionError::parse(format!("image header: {e}")))?;
            let source = reader
                .format()
                .ok_or_else(|| ConversionError::parse("unrecognised image format"))?;

            if let Some(mime) = passthrough_mime(source) {
                let (width, height) = reader
                    .into_dimensions()
                    .map_err(|e| ConversionError::parse(format!("image header: {e}")))?;
                debug!("Passing through {:?} {}x{}", source, width, height);
                return Ok(RawPage {
                    page_number: 1,
                    mime_type: mime,
                    bytes: input.to_vec(),
                });
            }

            let img = reader
                .decode()
                .map_err(|e| ConversionError::parse(format!("decode {source:?}: {e}")))?;
            // Formats whose header `limits` could not read are checked here.
            limits::check_image_pixels(img.width(), img.height(), max_pixels)?;

            let bytes = encode_page(&img, format, quality)?;
            debug!("Re-encoded {:?} → {:?}", source, format);
            Ok(RawPage {
                page_number: 1,
                mime_type: format.mime_type(),
                bytes,
            })
        })
        .await
        .map_err(|e| ConversionError::encode(format!("image task panicked: {e}")))??;

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_split_start(1);
            cb.on_page_rendered(1, 1, page.bytes.len());
        }
        Ok(vec![page])
    }
}

/// Formats emitted as-is.
fn passthrough_mime(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::Png => Some("image/png"),
        _ => None,
    }
}
