//! Page assembly: converter output → [`SplitResult`].
//!
//! This is the only place a `SplitResult` is constructed. Pages are sorted by
//! number and must then form exactly `1..=n`; a gap, a duplicate or an empty
//! page list means a converter broke its contract and the split fails rather
//! than return a result with holes in it.

use crate::error::{ConversionError, SplitError};
use crate::output::{base_component, PageArtifact, PageStatus, SplitResult};
use crate::pipeline::RawPage;
use tracing::debug;

/// Name and order raw pages into the final result.
///
/// Page file names are `{base}_page_{n}.{ext}`, where `base` is the original
/// filename without directory or extension and `ext` follows the page's own
/// MIME type, not the upload's.
pub fn assemble(original_file_name: &str, mut raw: Vec<RawPage>) -> Result<SplitResult, SplitError> {
    if raw.is_empty() {
        return Err(ConversionError::render("converter produced no pages").into());
    }
    raw.sort_by_key(|p| p.page_number);
    for (i, page) in raw.iter().enumerate() {
        if page.page_number != i + 1 {
            return Err(ConversionError::render(format!(
                "page sequence broken at position {}: got page {}",
                i + 1,
                page.page_number
            ))
            .into());
        }
    }

    let base = base_name(original_file_name);
    let pages: Vec<PageArtifact> = raw
        .into_iter()
        .map(|page| PageArtifact {
            page_number: page.page_number,
            file_name: format!(
                "{}_page_{}.{}",
                base,
                page.page_number,
                extension_for_mime(page.mime_type)
            ),
            mime_type: page.mime_type.to_string(),
            image_bytes: page.bytes,
            status: PageStatus::Pending,
            error: None,
        })
        .collect();

    debug!("Assembled {} pages for {:?}", pages.len(), original_file_name);
    Ok(SplitResult::from_assembled(original_file_name.to_string(), pages))
}

/// Last path component minus its final extension; `"document"` when nothing
/// usable is left.
pub fn base_name(file_name: &str) -> &str {
    let name = base_component(file_name.trim());
    let stem = match name.rfind('.') {
        Some(0) | None => name,
        Some(dot) => &name[..dot],
    };
    if stem.is_empty() {
        "document"
    } else {
        stem
    }
}

/// File extension for a page MIME type: the subtype, e.g. `jpeg` for
/// `image/jpeg`.
pub fn extension_for_mime(mime: &str) -> &str {
    match mime.split_once('/') {
        Some((_, subtype)) if !subtype.is_empty() => subtype,
        _ => "bin",
    }
}
