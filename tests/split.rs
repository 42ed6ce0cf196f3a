//! Integration tests for the public split API.
//!
//! Everything here runs without pdfium or LibreOffice: raster inputs are
//! converted in-process, and rejected inputs never reach an engine. Engine
//! tests live in `tests/e2e.rs`.

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use pagesplit::{
    split, split_sync, ErrorCategory, PageStatus, SplitConfig, SplitProgressCallback,
    UploadedFile,
};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn image_bytes(format: ImageFormat, width: u32, height: u32) -> Vec<u8> {
    let img = match format {
        ImageFormat::Jpeg => {
            DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
                Rgb([(x * 7) as u8, (y * 5) as u8, 128])
            }))
        }
        _ => DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([20, 40, 60, 255]))),
    };
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    buf
}

/// Counts every progress event.
#[derive(Default)]
struct EventCounter {
    events: AtomicUsize,
    rendered: AtomicUsize,
}

impl SplitProgressCallback for EventCounter {
    fn on_split_start(&self, _total_pages: usize) {
        self.events.fetch_add(1, Ordering::SeqCst);
    }

    fn on_page_rendered(&self, _page: usize, _total: usize, _len: usize) {
        self.events.fetch_add(1, Ordering::SeqCst);
        self.rendered.fetch_add(1, Ordering::SeqCst);
    }

    fn on_split_complete(&self, _total_pages: usize) {
        self.events.fetch_add(1, Ordering::SeqCst);
    }
}

fn counting_config(builder: pagesplit::SplitConfigBuilder) -> (SplitConfig, Arc<EventCounter>) {
    let counter = Arc::new(EventCounter::default());
    let config = builder
        .progress_callback(counter.clone() as Arc<dyn SplitProgressCallback>)
        .build()
        .unwrap();
    (config, counter)
}

// ── Single raster image ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_single_jpeg_scan() {
    let bytes = image_bytes(ImageFormat::Jpeg, 40, 30);
    let upload = UploadedFile::new(bytes.clone(), "scan.jpg", Some("image/jpeg".into()));

    let result = split(&upload, &SplitConfig::default()).await.unwrap();

    assert_eq!(result.total_pages(), 1);
    assert_eq!(result.original_file_name(), "scan.jpg");
    let page = &result.pages()[0];
    assert_eq!(page.page_number, 1);
    assert_eq!(page.file_name, "scan_page_1.jpeg");
    assert_eq!(page.mime_type, "image/jpeg");
    assert_eq!(page.status, PageStatus::Pending);
    assert!(page.error.is_none());
    assert_eq!(page.image_bytes, bytes, "JPEG must pass through unchanged");
}

#[tokio::test]
async fn test_png_declared_as_octet_stream() {
    let bytes = image_bytes(ImageFormat::Png, 12, 12);
    let upload = UploadedFile::new(bytes.clone(), "diagram.png", Some("application/octet-stream".into()));

    let result = split(&upload, &SplitConfig::default()).await.unwrap();

    assert_eq!(result.pages()[0].file_name, "diagram_page_1.png");
    assert_eq!(result.pages()[0].image_bytes, bytes);
}

#[tokio::test]
async fn test_wrongly_declared_type_uses_content() {
    // A PNG uploaded with a PDF content type is still a raster image.
    let bytes = image_bytes(ImageFormat::Png, 8, 8);
    let upload = UploadedFile::new(bytes, "upload.pdf", Some("application/pdf".into()));

    let result = split(&upload, &SplitConfig::default()).await.unwrap();
    assert_eq!(result.total_pages(), 1);
    assert_eq!(result.pages()[0].file_name, "upload_page_1.png");
}

#[tokio::test]
async fn test_bmp_reencoded_as_jpeg() {
    let upload = UploadedFile::new(image_bytes(ImageFormat::Bmp, 16, 9), "fax.bmp", None);

    let result = split(&upload, &SplitConfig::default()).await.unwrap();
    let page = &result.pages()[0];
    assert_eq!(page.mime_type, "image/jpeg");
    assert_eq!(page.file_name, "fax_page_1.jpeg");
    let decoded = image::load_from_memory(&page.image_bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (16, 9));
}

#[tokio::test]
async fn test_raster_split_is_deterministic() {
    let config = SplitConfig::default();
    for (format, name) in [(ImageFormat::Jpeg, "a.jpg"), (ImageFormat::Gif, "b.gif")] {
        let upload = UploadedFile::new(image_bytes(format, 20, 20), name, None);
        let first = split(&upload, &config).await.unwrap();
        let second = split(&upload, &config).await.unwrap();
        assert_eq!(first, second, "{name}");
    }
}

#[tokio::test]
async fn test_progress_events_for_raster() {
    let (config, counter) = counting_config(SplitConfig::builder());
    let upload = UploadedFile::new(image_bytes(ImageFormat::Png, 4, 4), "p.png", None);

    split(&upload, &config).await.unwrap();

    assert_eq!(counter.rendered.load(Ordering::SeqCst), 1);
    assert_eq!(counter.events.load(Ordering::SeqCst), 3);
}

// ── Rejections ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_plain_text_is_unsupported() {
    let (config, counter) = counting_config(SplitConfig::builder());
    let upload = UploadedFile::new(
        &b"Meeting notes\n- item one\n- item two\n"[..],
        "notes.txt",
        Some("text/plain".into()),
    );

    let err = split(&upload, &config).await.unwrap_err();

    assert_eq!(err.category(), ErrorCategory::UnsupportedFormat);
    assert!(err.stage().is_none());
    assert_eq!(counter.events.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_text_quoting_pdf_header_is_unsupported() {
    let (config, counter) = counting_config(SplitConfig::builder());
    let upload = UploadedFile::new(
        &b"Notes: every PDF starts with %PDF-1.7 and ends with %%EOF.\n"[..],
        "notes.txt",
        Some("text/plain".into()),
    );

    let err = split(&upload, &config).await.unwrap_err();

    assert_eq!(err.category(), ErrorCategory::UnsupportedFormat);
    assert_eq!(counter.events.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_plain_zip_is_unsupported() {
    let mut zip = b"PK\x03\x04".to_vec();
    zip.extend_from_slice(&[0u8; 26]);
    zip.extend_from_slice(b"photos/beach.jpg");
    let upload = UploadedFile::new(zip, "photos.zip", Some("application/zip".into()));

    let err = split(&upload, &SplitConfig::default()).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::UnsupportedFormat);
}

#[tokio::test]
async fn test_declared_size_over_limit() {
    let (config, counter) = counting_config(SplitConfig::builder().max_input_bytes(1024));
    let upload = UploadedFile::new(image_bytes(ImageFormat::Png, 4, 4), "small.png", None)
        .with_declared_size(10 * 1024);

    let err = split(&upload, &config).await.unwrap_err();

    assert_eq!(err.category(), ErrorCategory::ResourceLimit);
    assert!(err.message().contains("1024"), "{}", err.message());
    assert_eq!(counter.events.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_raster_pixel_cap() {
    let (config, counter) = counting_config(SplitConfig::builder().max_image_pixels(50 * 50));
    let upload = UploadedFile::new(image_bytes(ImageFormat::Png, 60, 60), "big.png", None);

    let err = split(&upload, &config).await.unwrap_err();

    assert_eq!(err.category(), ErrorCategory::ResourceLimit);
    assert_eq!(counter.events.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_corrupt_image_is_parse_failure() {
    let mut bytes = image_bytes(ImageFormat::Gif, 30, 30);
    bytes.truncate(16);
    let upload = UploadedFile::new(bytes, "broken.gif", None);

    let err = split(&upload, &SplitConfig::default()).await.unwrap_err();

    assert_eq!(
        err.category(),
        ErrorCategory::ConversionFailure {
            stage: pagesplit::ConversionStage::Parse
        }
    );
    assert!(err.diagnostic().is_some());
}

// ── Serialised shape ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_result_json_shape() {
    let bytes = image_bytes(ImageFormat::Png, 2, 2);
    let upload = UploadedFile::new(bytes, "scan.png", None);
    let result = split(&upload, &SplitConfig::default()).await.unwrap();

    let json: serde_json::Value = serde_json::to_value(&result).unwrap();
    assert_eq!(json["originalFileName"], "scan.png");
    assert_eq!(json["totalPages"], 1);
    let page = &json["pages"][0];
    assert_eq!(page["pageNumber"], 1);
    assert_eq!(page["fileName"], "scan_page_1.png");
    assert_eq!(page["mimeType"], "image/png");
    assert_eq!(page["status"], "pending");
    assert!(page.get("error").is_none());
    assert!(page["imageBytes"].as_str().is_some_and(|s| !s.is_empty()));
}

#[tokio::test]
async fn test_error_json_shape() {
    let upload = UploadedFile::new(&b"hello"[..], "hello.txt", None);
    let err = split(&upload, &SplitConfig::default()).await.unwrap_err();

    let json: serde_json::Value = serde_json::to_value(&err).unwrap();
    assert_eq!(json["category"]["kind"], "unsupportedFormat");
    assert!(json["message"].as_str().is_some());
}

// ── Sync wrapper ─────────────────────────────────────────────────────────────

#[test]
fn test_split_sync_raster() {
    let upload = UploadedFile::new(image_bytes(ImageFormat::Jpeg, 10, 10), "s.jpg", None);
    let result = split_sync(&upload, &SplitConfig::default()).unwrap();
    assert_eq!(result.total_pages(), 1);
}

#[tokio::test]
async fn test_write_to_dir() {
    let upload = UploadedFile::new(image_bytes(ImageFormat::Png, 3, 3), "out.png", None);
    let result = split(&upload, &SplitConfig::default()).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let written = result.write_to_dir(dir.path().join("pages")).await.unwrap();

    assert_eq!(written.len(), 1);
    assert!(written[0].ends_with("out_page_1.png"));
    assert_eq!(std::fs::read(&written[0]).unwrap(), result.pages()[0].image_bytes);
}
