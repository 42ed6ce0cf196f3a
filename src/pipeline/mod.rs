//! Pipeline stages for splitting an upload into page images.
//!
//! Each submodule implements exactly one step; [`crate::split::split`] wires them
//! together.
//!
//! ## Data Flow
//!
//! ```text
//! detect ──▶ limits ──▶ convert ──────────────────────▶ assemble
//! (sniff)    (caps)     render  (PDF, pdfium)            (names, order)
//!                       raster  (single image)
//!                       office  (soffice → PDF → render)
//! ```
//!
//! 1. [`detect`]   — classify bytes + declared MIME type into a [`FormatKind`]
//! 2. [`limits`]   — refuse oversize input before any conversion buffer exists
//! 3. [`render`], [`raster`], [`office`] — one [`PageConverter`] per format;
//!    [`encode`] is shared by all three
//! 4. [`assemble`] — order raw pages into a [`crate::SplitResult`]
//!
//! [`input`] sits outside the flow: it turns a CLI path or URL into the
//! [`crate::UploadedFile`] the pipeline consumes.
//!
//! [`FormatKind`]: crate::FormatKind

pub mod assemble;
pub mod detect;
pub mod encode;
pub mod input;
pub mod limits;
pub mod office;
pub mod raster;
pub mod render;

use crate::error::SplitError;
use std::future::Future;
use std::sync::Arc;

/// One page as produced by a converter, before naming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPage {
    /// 1-based position in the source document.
    pub page_number: usize,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Produce the ordered page images of one input.
///
/// Implementations return pages numbered `1..=n` in source order and fail as
/// a whole: a converter never returns a subset of the pages.
pub trait PageConverter: Send + Sync {
    fn convert(
        &self,
        input: Arc<[u8]>,
    ) -> impl Future<Output = Result<Vec<RawPage>, SplitError>> + Send;
}
