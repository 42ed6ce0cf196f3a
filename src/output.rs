//! Input and output data types of a split invocation.
//!
//! [`UploadedFile`] goes in, [`SplitResult`] comes out. A `SplitResult` can
//! only be built by the page assembler, which is what guarantees
//! `total_pages == pages.len()` and `pages[i].page_number == i + 1`.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

// ── Input ────────────────────────────────────────────────────────────────

/// A raw upload: payload plus what the client claimed about it.
///
/// Nothing here is trusted. The declared MIME type may be absent, generic or
/// wrong; the filename is only used to derive page names and as a hint for
/// ZIP-based Office formats.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    bytes: Arc<[u8]>,
    file_name: String,
    mime_type: Option<String>,
    declared_size: u64,
}

impl UploadedFile {
    pub fn new(
        bytes: impl Into<Arc<[u8]>>,
        file_name: impl Into<String>,
        mime_type: Option<String>,
    ) -> Self {
        let bytes = bytes.into();
        let declared_size = bytes.len() as u64;
        Self {
            bytes,
            file_name: file_name.into(),
            mime_type: mime_type.filter(|m| !m.trim().is_empty()),
            declared_size,
        }
    }

    /// Record the size the client announced (e.g. `Content-Length`).
    ///
    /// The limit check uses the larger of this and the actual payload length.
    pub fn with_declared_size(mut self, size: u64) -> Self {
        self.declared_size = size;
        self
    }

    /// Replace the declared MIME type.
    pub fn with_mime_type(mut self, mime: impl Into<String>) -> Self {
        let mime = mime.into();
        self.mime_type = (!mime.trim().is_empty()).then_some(mime);
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub fn declared_size(&self) -> u64 {
        self.declared_size
    }

    /// Size used for limit checks: the declared size or the payload length,
    /// whichever is larger.
    pub fn size(&self) -> u64 {
        self.declared_size.max(self.bytes.len() as u64)
    }

    /// Lowercased filename extension, if any.
    pub fn extension(&self) -> Option<String> {
        let name = base_component(&self.file_name);
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .map(str::to_ascii_lowercase)
    }
}

/// Last path component, treating both `/` and `\` as separators.
pub(crate) fn base_component(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// The closed set of input formats the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FormatKind {
    Pdf,
    RasterImage,
    OfficeDocument,
    Unsupported,
}

// ── Output ───────────────────────────────────────────────────────────────

/// Processing status of a page artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    /// Split succeeded; downstream extraction has not run yet.
    Pending,
    Failed,
}

/// One rendered page and its identifying metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageArtifact {
    pub page_number: usize,
    pub file_name: String,
    pub mime_type: String,
    /// Base64 in serialised form.
    #[serde(serialize_with = "serialize_b64", deserialize_with = "deserialize_b64")]
    pub image_bytes: Vec<u8>,
    pub status: PageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn serialize_b64<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&STANDARD.encode(bytes))
}

fn deserialize_b64<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
    let s = String::deserialize(d)?;
    STANDARD.decode(s).map_err(serde::de::Error::custom)
}

/// The complete, ordered output of one split invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitResult {
    original_file_name: String,
    total_pages: usize,
    pages: Vec<PageArtifact>,
}

impl SplitResult {
    /// Only the assembler calls this, after establishing the page invariants.
    pub(crate) fn from_assembled(original_file_name: String, pages: Vec<PageArtifact>) -> Self {
        Self {
            original_file_name,
            total_pages: pages.len(),
            pages,
        }
    }

    pub fn original_file_name(&self) -> &str {
        &self.original_file_name
    }

    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    pub fn pages(&self) -> &[PageArtifact] {
        &self.pages
    }

    pub fn into_pages(self) -> Vec<PageArtifact> {
        self.pages
    }

    /// Write every page image into `dir` under its `file_name`.
    ///
    /// Each file is written to a temporary sibling and renamed into place, so
    /// a crash never leaves a truncated page image behind.
    pub async fn write_to_dir(&self, dir: impl AsRef<Path>) -> std::io::Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;

        let mut written = Vec::with_capacity(self.pages.len());
        for page in &self.pages {
            let path = dir.join(&page.file_name);
            let tmp_path = dir.join(format!(".{}.tmp", page.file_name));
            tokio::fs::write(&tmp_path, &page.image_bytes).await?;
            tokio::fs::rename(&tmp_path, &path).await?;
            debug!("Wrote {} ({} bytes)", path.display(), page.image_bytes.len());
            written.push(path);
        }
        Ok(written)
    }
}

/// What [`crate::inspect`] learns without rendering any page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inspection {
    pub file_name: String,
    pub format: FormatKind,
    pub byte_size: u64,
    /// `None` when the count cannot be known without converting
    /// (Office documents).
    pub page_count: Option<usize>,
}
