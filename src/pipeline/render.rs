//! PDF rasterisation: render every page to an encoded image via pdfium.
//!
//! ## Worker pool
//!
//! Pages are split into contiguous chunks, one per worker, and each chunk is
//! rendered on a `spawn_blocking` thread. pdfium is CPU-bound C++ and must
//! never run on a Tokio worker thread. The first failing page sets a shared
//! abort flag; the other workers stop at their next page boundary and the
//! whole conversion fails. No partial result is ever returned.
//!
//! ## Binding
//!
//! The pdfium library is bound once per process and shared by all workers
//! (`thread_safe` and `sync` features). Search order: `pdfium_library_path` from the
//! config, then the working directory, then the system library path. The
//! configured path is only consulted by the first bind.
//!
//! ## Why cap pixels, not DPI?
//!
//! Page sizes vary wildly: an A0 poster at 150 DPI would produce a
//! 12,000 × 17,000 px image. `max_rendered_pixels` caps the longest edge
//! regardless of physical size, keeping memory bounded.

use crate::config::{PageImageFormat, SplitConfig};
use crate::error::{ConversionError, SplitError};
use crate::pipeline::encode::encode_page;
use crate::pipeline::{limits, PageConverter, RawPage};
use crate::progress::SplitProgressCallback;
use pdfium_render::prelude::*;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use tracing::{debug, info, warn};

static PDFIUM: OnceLock<Pdfium> = OnceLock::new();
static PDFIUM_INIT: Mutex<()> = Mutex::new(());

/// Converter for [`crate::FormatKind::Pdf`].
///
/// Also used by the Office converter on the intermediate PDF.
pub struct PdfConverter<'a> {
    config: &'a SplitConfig,
}

impl<'a> PdfConverter<'a> {
    pub fn new(config: &'a SplitConfig) -> Self {
        Self { config }
    }
}

/// Everything a render worker needs, detached from the config borrow.
#[derive(Clone)]
struct RenderSettings {
    dpi: u32,
    max_rendered_pixels: u32,
    format: PageImageFormat,
    jpeg_quality: u8,
    password: Option<String>,
    library_path: Option<PathBuf>,
}

impl RenderSettings {
    fn from_config(config: &SplitConfig) -> Self {
        Self {
            dpi: config.dpi,
            max_rendered_pixels: config.max_rendered_pixels,
            format: config.output_format,
            jpeg_quality: config.jpeg_quality,
            password: config.password.clone(),
            library_path: config.pdfium_library_path.clone(),
        }
    }
}

impl PageConverter for PdfConverter<'_> {
    async fn convert(&self, input: Arc<[u8]>) -> Result<Vec<RawPage>, SplitError> {
        let settings = RenderSettings::from_config(self.config);

        // ── Parse: open the container and count pages ───────────────────
        let total = count_pages(Arc::clone(&input), settings.clone()).await?;
        if total == 0 {
            return Err(ConversionError::parse("document has no pages").into());
        }
        limits::check_page_count(total, self.config)?;
        info!("PDF parsed: {} pages", total);

        let progress = self.config.progress_callback.clone();
        if let Some(ref cb) = progress {
            cb.on_split_start(total);
        }

        // ── Render: contiguous chunks, one blocking task each ───────────
        let workers = self.config.workers_for(total);
        let chunks = plan_chunks(total, workers);
        let abort = Arc::new(AtomicBool::new(false));
        debug!("Rendering {} pages in {} chunks", total, chunks.len());

        let handles: Vec<_> = chunks
            .into_iter()
            .map(|range| {
                let input = Arc::clone(&input);
                let settings = settings.clone();
                let abort = Arc::clone(&abort);
                let progress = progress.clone();
                tokio::task::spawn_blocking(move || {
                    render_range(&input, range, total, &settings, &abort, progress.as_deref())
                })
            })
            .collect();

        let results = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|joined| {
                joined
                    .map_err(|e| ConversionError::render(format!("render worker panicked: {e}")))
                    .and_then(|r| r)
            })
            .collect();

        Ok(collect_chunks(results)?)
    }
}

/// Split `0..total` into at most `workers` contiguous, non-overlapping ranges.
fn plan_chunks(total: usize, workers: usize) -> Vec<Range<usize>> {
    if total == 0 {
        return Vec::new();
    }
    let chunk = total.div_ceil(workers.clamp(1, total));
    (0..total)
        .step_by(chunk)
        .map(|start| start..(start + chunk).min(total))
        .collect()
}

/// Merge per-chunk results, given in chunk order.
///
/// Any failure discards every page. Chunks are in page order, so the error
/// kept is the one from the lowest-numbered failing chunk.
fn collect_chunks(
    results: Vec<Result<Vec<RawPage>, ConversionError>>,
) -> Result<Vec<RawPage>, ConversionError> {
    let mut pages = Vec::new();
    let mut failure: Option<ConversionError> = None;
    for outcome in results {
        match outcome {
            Ok(mut chunk_pages) if failure.is_none() => pages.append(&mut chunk_pages),
            Ok(_) => {}
            Err(e) if failure.is_none() => failure = Some(e),
            Err(e) => debug!("Additional render failure: {}", e),
        }
    }
    if let Some(e) = failure {
        return Err(e);
    }
    pages.sort_by_key(|p| p.page_number);
    Ok(pages)
}

/// Produce one page per index in `range`, stopping early once `abort` is set.
///
/// A failing page sets `abort` so sibling chunks stop at their next page.
fn run_chunk(
    range: Range<usize>,
    abort: &AtomicBool,
    mut page: impl FnMut(usize) -> Result<RawPage, ConversionError>,
) -> Result<Vec<RawPage>, ConversionError> {
    let mut out = Vec::with_capacity(range.len());
    for idx in range {
        if abort.load(Ordering::Relaxed) {
            debug!("Worker stopping before page {}: another page failed", idx + 1);
            break;
        }
        match page(idx) {
            Ok(raw) => out.push(raw),
            Err(e) => {
                abort.store(true, Ordering::Relaxed);
                warn!("Page {} failed: {}", idx + 1, e);
                return Err(e);
            }
        }
    }
    Ok(out)
}

/// pdfium takes the edge cap as `i32`.
fn pixel_cap(px: u32) -> Result<i32, ConversionError> {
    i32::try_from(px)
        .map_err(|_| ConversionError::render(format!("max_rendered_pixels {px} is out of range")))
}

/// Open a PDF and return its page count without rendering anything.
pub async fn read_page_count(config: &SplitConfig, input: Arc<[u8]>) -> Result<usize, SplitError> {
    count_pages(input, RenderSettings::from_config(config)).await
}

async fn count_pages(input: Arc<[u8]>, settings: RenderSettings) -> Result<usize, SplitError> {
    let count = tokio::task::spawn_blocking(move || -> Result<usize, ConversionError> {
        let pdfium = bind_pdfium(settings.library_path.as_deref())?;
        let document = open_document(pdfium, &input, settings.password.as_deref())?;
        Ok(document.pages().len() as usize)
    })
    .await
    .map_err(|e| ConversionError::parse(format!("parse task panicked: {e}")))??;
    Ok(count)
}

/// Blocking: render and encode pages `range` (0-based) of the document.
fn render_range(
    input: &[u8],
    range: Range<usize>,
    total: usize,
    settings: &RenderSettings,
    abort: &AtomicBool,
    progress: Option<&dyn SplitProgressCallback>,
) -> Result<Vec<RawPage>, ConversionError> {
    let cap = pixel_cap(settings.max_rendered_pixels)?;
    let pdfium = bind_pdfium(settings.library_path.as_deref())?;
    let document = open_document(pdfium, input, settings.password.as_deref())?;
    let pages = document.pages();

    let scale = settings.dpi as f32 / 72.0;
    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(scale)
        .set_maximum_width(cap)
        .set_maximum_height(cap);

    run_chunk(range, abort, |idx| {
        let page_number = idx + 1;
        let index = u16::try_from(idx)
            .map_err(|_| ConversionError::render(format!("page {page_number}: index out of range")))?;
        let render_err = |e: PdfiumError| ConversionError::render(format!("page {page_number}: {e:?}"));
        let page = pages.get(index).map_err(render_err)?;
        let bitmap = page.render_with_config(&render_config).map_err(render_err)?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            page_number,
            image.width(),
            image.height()
        );

        let bytes = encode_page(&image, settings.format, settings.jpeg_quality)
            .map_err(|e| ConversionError::encode(format!("page {page_number}: {}", e.detail)))?;

        if let Some(cb) = progress {
            cb.on_page_rendered(page_number, total, bytes.len());
        }
        Ok(RawPage {
            page_number,
            mime_type: settings.format.mime_type(),
            bytes,
        })
    })
}

fn open_document<'a>(
    pdfium: &'a Pdfium,
    input: &'a [u8],
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, ConversionError> {
    pdfium.load_pdf_from_byte_slice(input, password).map_err(|e| {
        let detail = format!("{:?}", e);
        if detail.contains("Password") || detail.contains("password") {
            if password.is_some() {
                ConversionError::parse("incorrect password for encrypted PDF")
            } else {
                ConversionError::parse("PDF is password-protected and no password was supplied")
            }
        } else {
            ConversionError::parse(format!("corrupt or unreadable PDF: {detail}"))
        }
    })
}

/// Bind the pdfium shared library, once per process.
fn bind_pdfium(library_path: Option<&Path>) -> Result<&'static Pdfium, ConversionError> {
    if let Some(pdfium) = PDFIUM.get() {
        return Ok(pdfium);
    }
    let _guard = PDFIUM_INIT
        .lock()
        .map_err(|_| ConversionError::parse("pdfium initialisation lock poisoned"))?;
    if let Some(pdfium) = PDFIUM.get() {
        return Ok(pdfium);
    }

    let bindings = match library_path {
        Some(path) if path.is_dir() => {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(path))
        }
        Some(path) => Pdfium::bind_to_library(path),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| {
        ConversionError::parse(format!(
            "pdfium library not available ({e:?}); set pdfium_library_path or install libpdfium"
        ))
    })?;

    info!("pdfium library bound");
    Ok(PDFIUM.get_or_init(|| Pdfium::new(bindings)))
}
