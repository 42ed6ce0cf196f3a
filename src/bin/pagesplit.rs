//! CLI binary for pagesplit.
//!
//! A thin shim over the library crate that maps CLI flags to `SplitConfig`,
//! resolves the input, and writes or prints the page images.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pagesplit::{
    inspect, resolve_input, split, ErrorCategory, PageImageFormat, PipelineError, ProgressCallback,
    SplitConfig, SplitProgressCallback,
};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── Terminal styling ─────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum Tone {
    Good,
    Bad,
    Faint,
    Strong,
}

/// Wrap `s` in an SGR sequence, unless stderr is not a terminal or
/// `NO_COLOR` is set.
fn paint(tone: Tone, s: &str) -> String {
    static COLOR: OnceLock<bool> = OnceLock::new();
    let enabled =
        *COLOR.get_or_init(|| std::env::var_os("NO_COLOR").is_none() && io::stderr().is_terminal());
    if !enabled {
        return s.to_string();
    }
    let sgr = match tone {
        Tone::Good => "32",
        Tone::Bad => "31",
        Tone::Faint => "2",
        Tone::Strong => "1",
    };
    format!("\x1b[{sgr}m{s}\x1b[0m")
}

// ── Split progress ───────────────────────────────────────────────────────────

/// Spinner while the input is detected and parsed, then a page bar.
///
/// Workers finish pages out of order, so the bar message names the most
/// recent page rather than implying a sequence.
struct CliProgressCallback {
    bar: ProgressBar,
    started: Instant,
}

impl CliProgressCallback {
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_message("detecting format");
        bar.enable_steady_tick(Duration::from_millis(120));
        Arc::new(Self {
            bar,
            started: Instant::now(),
        })
    }

    fn switch_to_pages(&self, total: usize) {
        let style = ProgressStyle::with_template("{wide_bar} {pos}/{len} pages  {msg}  [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        self.bar.set_style(style);
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_message("");
    }

    /// Clear the bar after a failed split.
    fn abandon(&self) {
        self.bar.finish_and_clear();
    }
}

impl SplitProgressCallback for CliProgressCallback {
    fn on_split_start(&self, total_pages: usize) {
        self.switch_to_pages(total_pages);
        let noun = if total_pages == 1 { "page" } else { "pages" };
        self.bar
            .println(format!("input has {} {noun}", paint(Tone::Strong, &total_pages.to_string())));
    }

    fn on_page_rendered(&self, page_number: usize, _total_pages: usize, byte_len: usize) {
        self.bar.set_message(format!(
            "latest: page {page_number} ({})",
            format_bytes(byte_len as u64)
        ));
        self.bar.inc(1);
    }

    fn on_split_complete(&self, total_pages: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} split {total_pages} page(s) in {} ms",
            paint(Tone::Good, "done:"),
            self.started.elapsed().as_millis()
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Split a PDF and write page images to ./pages
  pagesplit report.pdf -o pages/

  # A scanned photo: one page, passed through unchanged
  pagesplit scan.jpg -o pages/

  # Office document (needs LibreOffice)
  pagesplit minutes.docx -o pages/

  # From a URL, PNG pages at 200 DPI
  pagesplit https://example.com/spec.pdf --format png --dpi 200 -o pages/

  # JSON result (base64 page images) on stdout
  pagesplit --json invoice.pdf > result.json

  # Detect format and count pages only
  pagesplit --inspect-only upload.bin --mime application/pdf

SUPPORTED INPUTS:
  Kind      Formats                                  Engine
  ────────  ───────────────────────────────────────  ─────────────────
  pdf       PDF (optionally encrypted: --password)   pdfium
  image     JPEG, PNG (passthrough); GIF, WebP,      built-in
            BMP, TIFF (re-encoded)
  office    doc, docx, xls, xlsx, ppt, pptx,         soffice → pdfium
            odt, ods, odp, rtf

EXIT CODES:
  0  success
  1  usage, input or I/O error
  2  unsupported format
  3  resource limit exceeded
  4  conversion failure

ENVIRONMENT VARIABLES:
  PAGESPLIT_PDFIUM_LIB    Path to libpdfium (file or directory)
  PAGESPLIT_SOFFICE       LibreOffice binary (default: soffice)
  RUST_LOG                Override log filtering (e.g. pagesplit=debug)
  Every flag below also reads PAGESPLIT_<FLAG>.
"#;

/// Split PDFs, images and Office documents into one image per page.
#[derive(Parser, Debug)]
#[command(
    name = "pagesplit",
    version,
    about = "Split PDFs, images and Office documents into one image per page",
    long_about = "Detect the real format of an upload (ignoring a wrong declared MIME type), \
render it page by page within configurable resource limits, and emit one JPEG or PNG per page \
named {base}_page_{n}.{ext}.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local file path or HTTP/HTTPS URL.
    input: String,

    /// Write page images into this directory.
    #[arg(short, long, env = "PAGESPLIT_OUTPUT")]
    output: Option<PathBuf>,

    /// Declared MIME type (overrides the HTTP Content-Type).
    #[arg(long, env = "PAGESPLIT_MIME")]
    mime: Option<String>,

    /// Rendering DPI (72–600).
    #[arg(long, env = "PAGESPLIT_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Longest edge of a rendered page, in pixels.
    #[arg(long, env = "PAGESPLIT_MAX_RENDERED_PIXELS", default_value_t = 2500)]
    max_rendered_pixels: u32,

    /// Reject inputs larger than this many bytes.
    #[arg(long, env = "PAGESPLIT_MAX_INPUT_BYTES", default_value_t = 50 * 1024 * 1024)]
    max_input_bytes: u64,

    /// Reject documents with more pages than this.
    #[arg(long, env = "PAGESPLIT_MAX_PAGES", default_value_t = 500)]
    max_pages: usize,

    /// Reject raster images with more pixels than this.
    #[arg(long, env = "PAGESPLIT_MAX_IMAGE_PIXELS", default_value_t = 100_000_000)]
    max_image_pixels: u64,

    /// Render workers (default: available CPUs).
    #[arg(short, long, env = "PAGESPLIT_WORKERS")]
    workers: Option<usize>,

    /// Page image format.
    #[arg(long, env = "PAGESPLIT_FORMAT", value_enum, default_value = "jpeg")]
    format: FormatArg,

    /// JPEG quality (1–100).
    #[arg(long, env = "PAGESPLIT_QUALITY", default_value_t = 90,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PAGESPLIT_PASSWORD")]
    password: Option<String>,

    /// LibreOffice binary used for Office documents.
    #[arg(long, env = "PAGESPLIT_SOFFICE", default_value = "soffice")]
    soffice: PathBuf,

    /// Office → PDF timeout in seconds.
    #[arg(long, env = "PAGESPLIT_TIMEOUT", default_value_t = 120)]
    timeout: u64,

    /// Path to libpdfium (file or directory).
    #[arg(long, env = "PAGESPLIT_PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PAGESPLIT_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print the SplitResult (or Inspection) as JSON on stdout.
    #[arg(long, env = "PAGESPLIT_JSON")]
    json: bool,

    /// Detect format and count pages; render nothing.
    #[arg(long)]
    inspect_only: bool,

    /// Disable progress bar.
    #[arg(long, env = "PAGESPLIT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PAGESPLIT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PAGESPLIT_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Jpeg,
    Png,
}

impl From<FormatArg> for PageImageFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Jpeg => PageImageFormat::Jpeg,
            FormatArg::Png => PageImageFormat::Png,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress = show_progress.then(CliProgressCallback::new_dynamic);
    let config = build_config(&cli, progress.clone().map(|cb| cb as ProgressCallback))?;

    // ── Resolve input ────────────────────────────────────────────────────
    let mut upload = match resolve_input(&cli.input, &config).await {
        Ok(upload) => upload,
        Err(e) => {
            if let Some(ref cb) = progress {
                cb.abandon();
            }
            return Err(e).context("Failed to read input");
        }
    };
    if let Some(ref mime) = cli.mime {
        upload = upload.with_mime_type(mime.clone());
    }

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let info = match inspect(&upload, &config).await {
            Ok(info) => info,
            Err(e) => return Ok(report_failure(&e, cli.verbose)),
        };
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialise inspection")?
            );
        } else {
            println!("File:    {}", info.file_name);
            println!("Format:  {:?}", info.format);
            println!("Size:    {}", format_bytes(info.byte_size));
            match info.page_count {
                Some(n) => println!("Pages:   {n}"),
                None => println!("Pages:   unknown until rendered"),
            }
        }
        return Ok(ExitCode::SUCCESS);
    }

    // ── Split ────────────────────────────────────────────────────────────
    let result = match split(&upload, &config).await {
        Ok(result) => result,
        Err(e) => {
            if let Some(ref cb) = progress {
                cb.abandon();
            }
            return Ok(report_failure(&e, cli.verbose));
        }
    };

    // ── Output ───────────────────────────────────────────────────────────
    if let Some(ref dir) = cli.output {
        let written = result
            .write_to_dir(dir)
            .await
            .with_context(|| format!("Failed to write pages to {}", dir.display()))?;
        if !cli.quiet {
            eprintln!(
                "{} wrote {} file(s) to {}",
                paint(Tone::Good, "ok:"),
                written.len(),
                paint(Tone::Strong, &dir.display().to_string())
            );
        }
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&result).context("Failed to serialise result")?;
        println!("{json}");
    } else if cli.output.is_none() && !cli.quiet {
        for page in result.pages() {
            println!(
                "{:>4}  {:<40}  {:<10}  {}",
                page.page_number,
                page.file_name,
                page.mime_type,
                format_bytes(page.image_bytes.len() as u64)
            );
        }
        eprintln!("{}", paint(Tone::Faint, "pass --output DIR to write the images"));
    }

    Ok(ExitCode::SUCCESS)
}

/// Map CLI args to `SplitConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<SplitConfig> {
    let mut builder = SplitConfig::builder()
        .max_input_bytes(cli.max_input_bytes)
        .max_pages(cli.max_pages)
        .max_image_pixels(cli.max_image_pixels)
        .dpi(cli.dpi)
        .max_rendered_pixels(cli.max_rendered_pixels)
        .output_format(cli.format.into())
        .jpeg_quality(cli.quality)
        .office_converter(cli.soffice.clone())
        .normalize_timeout_secs(cli.timeout)
        .download_timeout_secs(cli.download_timeout);

    if let Some(n) = cli.workers {
        builder = builder.worker_pool_size(n);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library_path(lib.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Print a classified failure and pick the exit code for its category.
fn report_failure(err: &PipelineError, verbose: bool) -> ExitCode {
    eprintln!(
        "{} {}: {}",
        paint(Tone::Bad, "error:"),
        err.category(),
        err.message()
    );
    if verbose {
        if let Some(diag) = err.diagnostic() {
            eprintln!("{} {}", paint(Tone::Faint, "detail:"), diag);
        }
    }
    ExitCode::from(exit_code(err.category()))
}

fn exit_code(category: ErrorCategory) -> u8 {
    match category {
        ErrorCategory::UnsupportedFormat => 2,
        ErrorCategory::ResourceLimit => 3,
        ErrorCategory::ConversionFailure { .. } => 4,
    }
}

fn format_bytes(n: u64) -> String {
    const KIB: f64 = 1024.0;
    let n = n as f64;
    if n < KIB {
        format!("{n} B")
    } else if n < KIB * KIB {
        format!("{:.1} KiB", n / KIB)
    } else {
        format!("{:.1} MiB", n / (KIB * KIB))
    }
}
