//! Progress-callback trait for per-page split events.
//!
//! Inject an [`Arc<dyn SplitProgressCallback>`] via
//! [`crate::config::SplitConfigBuilder::progress_callback`] to receive events
//! as pages are rendered. Events only fire once conversion has begun: an input
//! rejected at detection or by a resource limit produces none.
//!
//! # Example
//!
//! ```rust
//! use pagesplit::{SplitConfig, SplitProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     rendered: AtomicUsize,
//! }
//!
//! impl SplitProgressCallback for CountingCallback {
//!     fn on_page_rendered(&self, page_number: usize, total_pages: usize, byte_len: usize) {
//!         let done = self.rendered.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("{done}/{total_pages} (page {page_number}, {byte_len} bytes)");
//!     }
//! }
//!
//! let cb = Arc::new(CountingCallback { rendered: AtomicUsize::new(0) });
//! let config = SplitConfig::builder()
//!     .progress_callback(cb as Arc<dyn SplitProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it converts pages.
///
/// # Thread safety
///
/// `on_page_rendered` is called from render worker threads, concurrently and
/// in completion order rather than page order. Implementations must protect
/// shared mutable state (e.g. `Mutex`, `AtomicUsize`).
pub trait SplitProgressCallback: Send + Sync {
    /// Called once the page count is known and rendering is about to start.
    fn on_split_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called after a page has been rendered and encoded.
    ///
    /// # Arguments
    /// * `page_number` — 1-indexed page number
    /// * `total_pages` — pages in the document
    /// * `byte_len`    — size of the encoded page image
    fn on_page_rendered(&self, page_number: usize, total_pages: usize, byte_len: usize) {
        let _ = (page_number, total_pages, byte_len);
    }

    /// Called once after every page rendered successfully.
    fn on_split_complete(&self, total_pages: usize) {
        let _ = total_pages;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl SplitProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::SplitConfig`].
pub type ProgressCallback = Arc<dyn SplitProgressCallback>;
