//! Resource limits, enforced before conversion buffers are allocated.
//!
//! Three caps bound worst-case memory under adversarial input:
//!
//! | Cap | Checked | Against |
//! |-----|---------|---------|
//! | `max_input_bytes`  | before any converter runs | declared size and payload length |
//! | `max_image_pixels` | before a raster is decoded | dimensions from the image header |
//! | `max_pages`        | after the document container is parsed, before the first page renders | page count |
//!
//! The page count of an Office document is only knowable after it has been
//! normalised to PDF, so for those the page cap is applied by the PDF
//! converter on the intermediate document.

use crate::config::SplitConfig;
use crate::error::SplitError;
use crate::output::{FormatKind, UploadedFile};
use std::io::Cursor;
use tracing::debug;

/// Limit checks that need nothing but the upload itself.
pub fn check_input(upload: &UploadedFile, kind: FormatKind, config: &SplitConfig) -> Result<(), SplitError> {
    let size = upload.size();
    if size > config.max_input_bytes {
        return Err(SplitError::InputTooLarge {
            size,
            max: config.max_input_bytes,
        });
    }

    // A raster is one page by definition; its pixel count is the cap that matters.
    if kind == FormatKind::RasterImage {
        if let Some((width, height)) = image_dimensions(upload.bytes()) {
            check_image_pixels(width, height, config.max_image_pixels)?;
        }
    }

    debug!("Limit check passed: {} bytes, {:?}", size, kind);
    Ok(())
}

/// Page-count cap, applied as soon as the count is known.
pub fn check_page_count(pages: usize, config: &SplitConfig) -> Result<(), SplitError> {
    if pages > config.max_pages {
        return Err(SplitError::TooManyPages {
            pages,
            max: config.max_pages,
        });
    }
    Ok(())
}

pub fn check_image_pixels(width: u32, height: u32, max_pixels: u64) -> Result<(), SplitError> {
    if u64::from(width) * u64::from(height) > max_pixels {
        return Err(SplitError::ImageTooLarge {
            width,
            height,
            max_pixels,
        });
    }
    Ok(())
}

/// Read width and height from the image header without decoding pixels.
///
/// Returns `None` when the header is unreadable; the raster converter reports
/// that as a parse failure.
pub fn image_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}
