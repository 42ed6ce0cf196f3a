//! # pagesplit
//!
//! Split an uploaded file into one raster image per logical page.
//!
//! An upload arrives as bytes plus whatever the client claimed about it (a
//! MIME type, a filename). It may be a multi-page PDF, a single raster image
//! or an Office document. Downstream extraction wants exactly one thing: an
//! ordered list of page images. This crate detects what the upload really is,
//! renders it page by page within fixed resource limits, and returns a
//! uniform [`SplitResult`] regardless of source format.
//!
//! ## Pipeline Overview
//!
//! ```text
//! UploadedFile
//!  │
//!  ├─ 1. Detect    sniff signatures, cross-check declared MIME type
//!  ├─ 2. Limits    input size, raster dimensions (page count once known)
//!  ├─ 3. Convert   PDF → pdfium │ image → passthrough/re-encode │ Office → soffice → PDF
//!  └─ 4. Assemble  {base}_page_{n}.{ext}, status = pending
//! ```
//!
//! Any failure is classified into a [`PipelineError`] with one of three
//! categories: unsupported format, conversion failure (with stage), or
//! resource limit. A split never returns a partial result.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pagesplit::{split, SplitConfig, UploadedFile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bytes = std::fs::read("scan.pdf")?;
//!     let upload = UploadedFile::new(bytes, "scan.pdf", Some("application/pdf".into()));
//!     let result = split(&upload, &SplitConfig::default()).await?;
//!     for page in result.pages() {
//!         println!("{} ({} bytes)", page.file_name, page.image_bytes.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pagesplit` binary (clap + indicatif + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pagesplit = { version = "0.1", default-features = false }
//! ```
//!
//! ## Runtime Requirements
//!
//! | Input | Needs |
//! |-------|-------|
//! | PDF | the pdfium shared library (`libpdfium.so` / `.dylib` / `pdfium.dll`) |
//! | Raster image | nothing |
//! | Office document | LibreOffice (`soffice`) on `PATH` or configured, plus pdfium |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod split;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PageImageFormat, SplitConfig, SplitConfigBuilder};
pub use error::{
    classify, ConfigError, ConversionError, ConversionStage, ErrorCategory, InputError,
    PipelineError, SplitError,
};
pub use output::{FormatKind, Inspection, PageArtifact, PageStatus, SplitResult, UploadedFile};
pub use pipeline::detect::detect_format;
pub use pipeline::input::resolve_input;
pub use progress::{NoopProgressCallback, ProgressCallback, SplitProgressCallback};
pub use split::{inspect, split, split_sync};
