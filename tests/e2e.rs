//! End-to-end tests against the real rendering engines.
//!
//! These need the pdfium shared library (and LibreOffice for the Office
//! test), so they are gated behind the `E2E_ENABLED` environment variable and
//! do not run in CI unless explicitly requested. Test PDFs are generated in
//! memory; there are no fixture files.
//!
//! Run with:
//!   E2E_ENABLED=1 LD_LIBRARY_PATH=. cargo test --test e2e -- --nocapture

use pagesplit::{
    inspect, split, ConversionStage, ErrorCategory, FormatKind, PageImageFormat, SplitConfig,
    SplitProgressCallback, UploadedFile,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip this test unless E2E_ENABLED is set.
macro_rules! e2e_skip_unless_ready {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
    }};
}

/// A minimal valid PDF with `pages` US-Letter pages, each showing its number.
fn make_pdf(pages: usize) -> Vec<u8> {
    const FIRST_PAGE_OBJ: usize = 4;
    let kids: Vec<String> = (0..pages)
        .map(|i| format!("{} 0 R", FIRST_PAGE_OBJ + 2 * i))
        .collect();

    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), pages),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];
    for i in 0..pages {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
            FIRST_PAGE_OBJ + 2 * i + 1
        ));
        let content = format!("BT /F1 48 Tf 72 640 Td (Page {}) Tj ET", i + 1);
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            content
        ));
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref_at = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_at
        )
        .as_bytes(),
    );
    out
}

fn pdf_upload(pages: usize, name: &str) -> UploadedFile {
    UploadedFile::new(make_pdf(pages), name, Some("application/pdf".into()))
}

#[derive(Default)]
struct TrackingCallback {
    started: AtomicUsize,
    rendered: AtomicUsize,
    completed: AtomicUsize,
}

impl SplitProgressCallback for TrackingCallback {
    fn on_split_start(&self, _total: usize) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }
    fn on_page_rendered(&self, _page: usize, _total: usize, _len: usize) {
        self.rendered.fetch_add(1, Ordering::SeqCst);
    }
    fn on_split_complete(&self, _total: usize) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

fn soffice_available() -> bool {
    std::process::Command::new("soffice")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

// ── PDF ──────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_three_page_pdf() {
    e2e_skip_unless_ready!();

    let result = split(&pdf_upload(3, "doc.pdf"), &SplitConfig::default())
        .await
        .expect("split should succeed");

    assert_eq!(result.total_pages(), 3);
    let names: Vec<_> = result.pages().iter().map(|p| p.file_name.as_str()).collect();
    assert_eq!(names, ["doc_page_1.jpeg", "doc_page_2.jpeg", "doc_page_3.jpeg"]);
    for (i, page) in result.pages().iter().enumerate() {
        assert_eq!(page.page_number, i + 1);
        assert_eq!(page.mime_type, "image/jpeg");
        let img = image::load_from_memory(&page.image_bytes).expect("valid JPEG");
        // Letter portrait at 150 DPI ≈ 1275×1650.
        assert!(img.height() > img.width());
        assert!(img.width() > 1000 && img.height() <= 2500, "{}x{}", img.width(), img.height());
    }
}

#[tokio::test]
async fn test_page_order_with_many_workers() {
    e2e_skip_unless_ready!();

    let config = SplitConfig::builder()
        .worker_pool_size(3)
        .dpi(72)
        .build()
        .unwrap();
    let result = split(&pdf_upload(7, "long.pdf"), &config).await.unwrap();

    assert_eq!(result.total_pages(), 7);
    for (i, page) in result.pages().iter().enumerate() {
        assert_eq!(page.page_number, i + 1);
        assert_eq!(page.file_name, format!("long_page_{}.jpeg", i + 1));
    }
}

#[tokio::test]
async fn test_page_limit_rejects_before_rendering() {
    e2e_skip_unless_ready!();

    let tracker = Arc::new(TrackingCallback::default());
    let config = SplitConfig::builder()
        .max_pages(2)
        .progress_callback(tracker.clone() as Arc<dyn SplitProgressCallback>)
        .build()
        .unwrap();

    let err = split(&pdf_upload(3, "doc.pdf"), &config).await.unwrap_err();

    assert_eq!(err.category(), ErrorCategory::ResourceLimit);
    assert_eq!(tracker.started.load(Ordering::SeqCst), 0);
    assert_eq!(tracker.rendered.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_progress_events_for_pdf() {
    e2e_skip_unless_ready!();

    let tracker = Arc::new(TrackingCallback::default());
    let config = SplitConfig::builder()
        .dpi(72)
        .progress_callback(tracker.clone() as Arc<dyn SplitProgressCallback>)
        .build()
        .unwrap();

    split(&pdf_upload(4, "p.pdf"), &config).await.unwrap();

    assert_eq!(tracker.started.load(Ordering::SeqCst), 1);
    assert_eq!(tracker.rendered.load(Ordering::SeqCst), 4);
    assert_eq!(tracker.completed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_png_output_and_pixel_cap() {
    e2e_skip_unless_ready!();

    let config = SplitConfig::builder()
        .output_format(PageImageFormat::Png)
        .max_rendered_pixels(500)
        .build()
        .unwrap();
    let result = split(&pdf_upload(1, "small.pdf"), &config).await.unwrap();

    let page = &result.pages()[0];
    assert_eq!(page.file_name, "small_page_1.png");
    assert_eq!(page.mime_type, "image/png");
    let img = image::load_from_memory(&page.image_bytes).unwrap();
    assert!(img.width().max(img.height()) <= 500, "{}x{}", img.width(), img.height());
}

#[tokio::test]
async fn test_pdf_sniffed_despite_generic_type() {
    e2e_skip_unless_ready!();

    let upload = UploadedFile::new(make_pdf(2), "blob", Some("application/octet-stream".into()));
    let result = split(&upload, &SplitConfig::default()).await.unwrap();
    assert_eq!(result.total_pages(), 2);
    assert_eq!(result.pages()[1].file_name, "blob_page_2.jpeg");
}

#[tokio::test]
async fn test_corrupt_pdf_is_parse_failure() {
    e2e_skip_unless_ready!();

    let upload = UploadedFile::new(&b"%PDF-1.7\nthis is not really a pdf"[..], "bad.pdf", None);
    let err = split(&upload, &SplitConfig::default()).await.unwrap_err();

    assert_eq!(
        err.category(),
        ErrorCategory::ConversionFailure {
            stage: ConversionStage::Parse
        }
    );
    assert!(err.diagnostic().is_some());
}

#[tokio::test]
async fn test_inspect_counts_pages() {
    e2e_skip_unless_ready!();

    let info = inspect(&pdf_upload(5, "five.pdf"), &SplitConfig::default())
        .await
        .unwrap();
    assert_eq!(info.format, FormatKind::Pdf);
    assert_eq!(info.page_count, Some(5));
}

#[tokio::test]
async fn test_inspect_applies_page_limit() {
    e2e_skip_unless_ready!();

    let config = SplitConfig::builder().max_pages(4).build().unwrap();
    let err = inspect(&pdf_upload(5, "five.pdf"), &config).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::ResourceLimit);
}

// ── Office ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_rtf_via_libreoffice() {
    e2e_skip_unless_ready!();
    if !soffice_available() {
        println!("SKIP — soffice not found on PATH");
        return;
    }

    let upload = UploadedFile::new(
        &b"{\\rtf1\\ansi\\deff0 {\\fonttbl {\\f0 Helvetica;}} \\f0\\fs48 Hello from RTF\\par}"[..],
        "memo.rtf",
        Some("application/rtf".into()),
    );
    let result = split(&upload, &SplitConfig::default()).await.unwrap();

    assert!(result.total_pages() >= 1);
    assert_eq!(result.pages()[0].file_name, "memo_page_1.jpeg");
}
