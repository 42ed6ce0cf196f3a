//! Split entry points: one upload in, an ordered set of page images out.
//!
//! Every failure leaving this module is a [`PipelineError`]. The internal
//! [`SplitError`] is logged with its diagnostic and then classified, so
//! callers never see engine output, paths or stack details in `message`.

use crate::config::SplitConfig;
use crate::error::{classify, ConversionError, PipelineError, SplitError};
use crate::output::{FormatKind, Inspection, SplitResult, UploadedFile};
use crate::pipeline::office::OfficeConverter;
use crate::pipeline::raster::ImageConverter;
use crate::pipeline::render::{self, PdfConverter};
use crate::pipeline::{assemble, detect, limits, PageConverter};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Split an upload into page images.
///
/// The result is all-or-nothing: either every page of the input is present,
/// numbered `1..=n`, or an error is returned and no pages are.
///
/// # Errors
/// - [`crate::ErrorCategory::UnsupportedFormat`] when the input is not a PDF,
///   supported raster image or Office document
/// - [`crate::ErrorCategory::ResourceLimit`] when the input exceeds a
///   configured cap; nothing has been rendered in that case
/// - [`crate::ErrorCategory::ConversionFailure`] when a supported input could
///   not be parsed, normalised, rendered or encoded
pub async fn split(upload: &UploadedFile, config: &SplitConfig) -> Result<SplitResult, PipelineError> {
    let start = Instant::now();
    info!(
        "Starting split: {:?} ({} bytes, declared {:?})",
        upload.file_name(),
        upload.size(),
        upload.mime_type()
    );

    match split_inner(upload, config).await {
        Ok(result) => {
            info!(
                "Split {:?} into {} pages in {}ms",
                upload.file_name(),
                result.total_pages(),
                start.elapsed().as_millis()
            );
            Ok(result)
        }
        Err(err) => Err(reject(upload, err)),
    }
}

async fn split_inner(upload: &UploadedFile, config: &SplitConfig) -> Result<SplitResult, SplitError> {
    // ── Step 1: Detect format ────────────────────────────────────────────
    let kind = detect_kind(upload)?;

    // ── Step 2: Limit check ──────────────────────────────────────────────
    limits::check_input(upload, kind, config)?;

    // ── Step 3: Convert ──────────────────────────────────────────────────
    let convert_start = Instant::now();
    let input = upload.shared_bytes();
    let raw = match kind {
        FormatKind::Pdf => PdfConverter::new(config).convert(input).await?,
        FormatKind::RasterImage => ImageConverter::new(config).convert(input).await?,
        FormatKind::OfficeDocument => {
            OfficeConverter::new(config, upload.extension())
                .convert(input)
                .await?
        }
        FormatKind::Unsupported => {
            return Err(SplitError::unsupported(upload.mime_type(), upload.bytes()))
        }
    };
    debug!(
        "Converted {} pages in {}ms",
        raw.len(),
        convert_start.elapsed().as_millis()
    );

    // ── Step 4: Assemble ─────────────────────────────────────────────────
    let result = assemble::assemble(upload.file_name(), raw)?;

    if let Some(ref cb) = config.progress_callback {
        cb.on_split_complete(result.total_pages());
    }
    Ok(result)
}

/// Synchronous wrapper around [`split`] for non-async callers.
///
/// Builds a private Tokio runtime; must not be called from inside one.
pub fn split_sync(upload: &UploadedFile, config: &SplitConfig) -> Result<SplitResult, PipelineError> {
    let runtime = tokio::runtime::Runtime::new().map_err(|e| {
        classify(&ConversionError::render(format!("failed to create tokio runtime: {e}")).into())
    })?;
    runtime.block_on(split(upload, config))
}

/// Detect the format and apply the limit checks without rendering a page.
///
/// The page count is reported when it is knowable cheaply: parsed from a
/// PDF, always 1 for a raster image, unknown for an Office document (it
/// would need a full normalisation).
pub async fn inspect(upload: &UploadedFile, config: &SplitConfig) -> Result<Inspection, PipelineError> {
    let inspect_inner = async {
        let kind = detect_kind(upload)?;
        limits::check_input(upload, kind, config)?;

        let page_count = match kind {
            FormatKind::Pdf => {
                let pages = render::read_page_count(config, upload.shared_bytes()).await?;
                limits::check_page_count(pages, config)?;
                Some(pages)
            }
            FormatKind::RasterImage => Some(1),
            FormatKind::OfficeDocument | FormatKind::Unsupported => None,
        };

        Ok::<_, SplitError>(Inspection {
            file_name: upload.file_name().to_string(),
            format: kind,
            byte_size: upload.size(),
            page_count,
        })
    };

    inspect_inner.await.map_err(|err| reject(upload, err))
}

fn detect_kind(upload: &UploadedFile) -> Result<FormatKind, SplitError> {
    let extension = upload.extension();
    match detect::detect_format(upload.bytes(), upload.mime_type(), extension.as_deref()) {
        FormatKind::Unsupported => Err(SplitError::unsupported(upload.mime_type(), upload.bytes())),
        kind => Ok(kind),
    }
}

fn reject(upload: &UploadedFile, err: SplitError) -> PipelineError {
    let classified = classify(&err);
    warn!(
        "Split of {:?} failed ({}): {}",
        upload.file_name(),
        classified.category(),
        err
    );
    classified
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    #[tokio::test]
    async fn plain_text_is_rejected_as_unsupported() {
        let upload = UploadedFile::new(&b"just some notes"[..], "notes.txt", Some("text/plain".into()));
        let err = split(&upload, &SplitConfig::default()).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::UnsupportedFormat);
        assert!(err.diagnostic().is_some());
    }

    #[tokio::test]
    async fn empty_upload_is_unsupported() {
        let upload = UploadedFile::new(Vec::new(), "empty.pdf", Some("application/pdf".into()));
        let err = split(&upload, &SplitConfig::default()).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::UnsupportedFormat);
    }

    #[tokio::test]
    async fn oversize_pdf_is_rejected_before_rendering() {
        // Never reaches pdfium: the limit check runs first.
        let config = SplitConfig::builder().max_input_bytes(16).build().unwrap();
        let upload = UploadedFile::new(&b"%PDF-1.7\n plus some padding bytes"[..], "big.pdf", None);
        let err = split(&upload, &config).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::ResourceLimit);
    }

    #[tokio::test]
    async fn inspect_raster_reports_one_page() {
        let mut png = Vec::new();
        image::DynamicImage::ImageRgb8(image::RgbImage::new(4, 4))
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let upload = UploadedFile::new(png, "tiny.png", None);
        let info = inspect(&upload, &SplitConfig::default()).await.unwrap();
        assert_eq!(info.format, FormatKind::RasterImage);
        assert_eq!(info.page_count, Some(1));
    }

    #[tokio::test]
    async fn inspect_office_page_count_unknown() {
        let upload = UploadedFile::new(&b"{\\rtf1 hi}"[..], "memo.rtf", None);
        let info = inspect(&upload, &SplitConfig::default()).await.unwrap();
        assert_eq!(info.format, FormatKind::OfficeDocument);
        assert_eq!(info.page_count, None);
    }

    #[test]
    fn split_sync_runs_without_a_runtime() {
        let upload = UploadedFile::new(&b"nope"[..], "x.bin", None);
        let err = split_sync(&upload, &SplitConfig::default()).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::UnsupportedFormat);
    }
}
