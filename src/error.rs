//! Error types for the pagesplit library.
//!
//! Two layers reflect two audiences:
//!
//! * [`SplitError`] — **Internal**: everything the pipeline knows about a
//!   failure (declared MIME type, leading bytes, pdfium error text, the
//!   LibreOffice stderr, …). Produced by every stage and converter.
//!
//! * [`PipelineError`] — **Caller-facing**: one of three stable categories, a
//!   message that is safe to show an end user, and the internal detail kept
//!   apart as an optional diagnostic for logs.
//!
//! [`classify`] is the only bridge between the two. The public entry points in
//! [`crate::split`] always return `PipelineError`, never `SplitError`.
//!
//! [`InputError`] and [`ConfigError`] belong to the calling side (resolving a
//! CLI argument into an upload, validating a builder) and never cross into the
//! pipeline taxonomy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

// ── Stage tags ───────────────────────────────────────────────────────────

/// The conversion sub-step at which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionStage {
    /// Reading the container: PDF structure, image header, engine binding.
    Parse,
    /// Rasterising a page.
    Render,
    /// Encoding a rendered page as JPEG/PNG.
    Encode,
    /// Turning an Office document into an intermediate PDF.
    Normalize,
}

impl fmt::Display for ConversionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConversionStage::Parse => "parse",
            ConversionStage::Render => "render",
            ConversionStage::Encode => "encode",
            ConversionStage::Normalize => "normalize",
        };
        f.write_str(s)
    }
}

/// A converter failure, tagged with the stage that produced it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{stage} failed: {detail}")]
pub struct ConversionError {
    pub stage: ConversionStage,
    pub detail: String,
}

impl ConversionError {
    pub fn new(stage: ConversionStage, detail: impl Into<String>) -> Self {
        Self {
            stage,
            detail: detail.into(),
        }
    }

    pub fn parse(detail: impl Into<String>) -> Self {
        Self::new(ConversionStage::Parse, detail)
    }

    pub fn render(detail: impl Into<String>) -> Self {
        Self::new(ConversionStage::Render, detail)
    }

    pub fn encode(detail: impl Into<String>) -> Self {
        Self::new(ConversionStage::Encode, detail)
    }

    pub fn normalize(detail: impl Into<String>) -> Self {
        Self::new(ConversionStage::Normalize, detail)
    }
}

// ── Internal pipeline errors ─────────────────────────────────────────────

/// Every way a split invocation can fail, with full internal detail.
#[derive(Debug, Error)]
pub enum SplitError {
    /// Neither the declared MIME type nor the leading bytes match a supported format.
    #[error("unsupported format (declared {declared:?}, leading bytes {signature})")]
    UnsupportedFormat {
        declared: Option<String>,
        /// Hex rendering of up to the first 8 bytes.
        signature: String,
    },

    /// Declared or measured input size exceeds `max_input_bytes`.
    #[error("input is {size} bytes, limit is {max}")]
    InputTooLarge { size: u64, max: u64 },

    /// The document's page count exceeds `max_pages`.
    #[error("document has {pages} pages, limit is {max}")]
    TooManyPages { pages: usize, max: usize },

    /// A raster image's pixel count exceeds `max_image_pixels`.
    #[error("image is {width}x{height} pixels, limit is {max_pixels} pixels")]
    ImageTooLarge {
        width: u32,
        height: u32,
        max_pixels: u64,
    },

    /// A converter failed at one of its stages.
    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

impl SplitError {
    /// Build an [`SplitError::UnsupportedFormat`] from the raw payload.
    pub fn unsupported(declared: Option<&str>, bytes: &[u8]) -> Self {
        SplitError::UnsupportedFormat {
            declared: declared.map(str::to_string),
            signature: hex_prefix(bytes, 8),
        }
    }
}

fn hex_prefix(bytes: &[u8], n: usize) -> String {
    if bytes.is_empty() {
        return "<empty>".to_string();
    }
    bytes
        .iter()
        .take(n)
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Caller-facing errors ─────────────────────────────────────────────────

/// The stable external error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ErrorCategory {
    /// The input matches no supported format signature or declared type.
    UnsupportedFormat,
    /// The format was recognised but conversion failed at `stage`.
    ConversionFailure { stage: ConversionStage },
    /// A configured size or page-count cap was exceeded.
    ResourceLimit,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::UnsupportedFormat => f.write_str("unsupported format"),
            ErrorCategory::ConversionFailure { stage } => {
                write!(f, "conversion failure ({stage})")
            }
            ErrorCategory::ResourceLimit => f.write_str("resource limit"),
        }
    }
}

/// The single structured error returned by every public split entry point.
///
/// `message` is written for end users. `diagnostic` carries the internal
/// detail for logs and is never the only signal: `category` alone is enough
/// to decide how to respond.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("{category}: {message}")]
#[serde(rename_all = "camelCase")]
pub struct PipelineError {
    pub category: ErrorCategory,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl PipelineError {
    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn diagnostic(&self) -> Option<&str> {
        self.diagnostic.as_deref()
    }

    /// The failing stage, for `ConversionFailure` errors.
    pub fn stage(&self) -> Option<ConversionStage> {
        match self.category {
            ErrorCategory::ConversionFailure { stage } => Some(stage),
            _ => None,
        }
    }
}

/// Map an internal error onto the external taxonomy.
///
/// Limit breaches report the numbers involved (they describe the caller's own
/// input). Everything else gets a fixed message; the internal text only ever
/// lands in `diagnostic`.
pub fn classify(err: &SplitError) -> PipelineError {
    match err {
        SplitError::UnsupportedFormat { .. } => PipelineError {
            category: ErrorCategory::UnsupportedFormat,
            message: "The uploaded file type is not supported. Upload a PDF, an image \
                      (JPEG, PNG, GIF, WebP, BMP, TIFF) or an Office document."
                .to_string(),
            diagnostic: Some(err.to_string()),
        },
        SplitError::InputTooLarge { size, max } => PipelineError {
            category: ErrorCategory::ResourceLimit,
            message: format!("The uploaded file is too large ({size} bytes; the limit is {max} bytes)."),
            diagnostic: None,
        },
        SplitError::TooManyPages { pages, max } => PipelineError {
            category: ErrorCategory::ResourceLimit,
            message: format!("The document has {pages} pages; at most {max} pages are allowed."),
            diagnostic: None,
        },
        SplitError::ImageTooLarge {
            width,
            height,
            max_pixels,
        } => PipelineError {
            category: ErrorCategory::ResourceLimit,
            message: format!(
                "The image is too large ({width}x{height} pixels; the limit is {max_pixels} pixels)."
            ),
            diagnostic: None,
        },
        SplitError::Conversion(ConversionError { stage, detail }) => PipelineError {
            category: ErrorCategory::ConversionFailure { stage: *stage },
            message: stage_message(*stage).to_string(),
            diagnostic: Some(detail.clone()),
        },
    }
}

fn stage_message(stage: ConversionStage) -> &'static str {
    match stage {
        ConversionStage::Parse => {
            "The file could not be read. It may be corrupt, password-protected, or not what its name suggests."
        }
        ConversionStage::Render => "A page of the document could not be rendered.",
        ConversionStage::Encode => "A rendered page could not be encoded as an image.",
        ConversionStage::Normalize => "The document could not be prepared for page rendering.",
    }
}

impl From<SplitError> for PipelineError {
    fn from(err: SplitError) -> Self {
        classify(&err)
    }
}

// ── Caller-side errors ───────────────────────────────────────────────────

/// Failures while turning a path or URL into an [`crate::UploadedFile`].
#[derive(Debug, Error)]
pub enum InputError {
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is neither a file path nor a valid URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// Known to exceed `max_input_bytes` before the payload was read in full.
    #[error("'{input}' is larger than the {max}-byte input limit")]
    TooLarge { input: String, max: u64 },

    /// Reading a local file failed after it was opened.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Builder validation failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid configuration: {0}")]
pub struct ConfigError(pub String);
