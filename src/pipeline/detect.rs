//! Format detection: classify an upload as PDF, raster image or Office document.
//!
//! The declared MIME type comes from the client and is routinely wrong
//! (`application/octet-stream` for everything, `image/jpeg` on a PNG). Leading
//! bytes are checked first and win; the declared type only decides when no
//! signature matches. Detection is pure: nothing is decoded or allocated.

use crate::output::FormatKind;
use tracing::{debug, warn};

const PDF_MIME: &[&str] = &["application/pdf", "application/x-pdf"];

const RASTER_MIME: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/pjpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/bmp",
    "image/x-ms-bmp",
    "image/tiff",
];

const OFFICE_MIME: &[&str] = &[
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "application/vnd.oasis.opendocument.text",
    "application/vnd.oasis.opendocument.spreadsheet",
    "application/vnd.oasis.opendocument.presentation",
    "application/rtf",
    "text/rtf",
];

/// Declared types that say nothing about the content.
const GENERIC_MIME: &[&str] = &[
    "application/octet-stream",
    "binary/octet-stream",
    "application/binary",
    "application/unknown",
    "application/zip",
    "application/x-zip-compressed",
];

/// Extensions that make a bare ZIP archive an Office document.
pub(crate) const OFFICE_EXTENSIONS: &[&str] = &[
    "doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "ods", "odp", "rtf",
];

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Classify an upload.
///
/// # Arguments
/// * `bytes`     — raw payload
/// * `declared`  — client-supplied MIME type, if any
/// * `extension` — lowercased filename extension, if any
///
/// Returns [`FormatKind::Unsupported`] when neither a signature nor the
/// declared type identifies a supported format, and always for an empty
/// payload.
pub fn detect_format(bytes: &[u8], declared: Option<&str>, extension: Option<&str>) -> FormatKind {
    if bytes.is_empty() {
        debug!("Empty payload");
        return FormatKind::Unsupported;
    }

    let declared_mime = declared.map(normalize_mime);
    let declared_kind = declared_mime.as_deref().and_then(kind_for_mime);

    match sniff(bytes, extension) {
        Some(sniffed) => {
            if let Some(claimed) = declared_kind {
                if claimed != sniffed {
                    warn!(
                        "Declared type {:?} says {:?} but content looks like {:?}; using content",
                        declared_mime, claimed, sniffed
                    );
                }
            }
            debug!("Sniffed {:?}", sniffed);
            sniffed
        }
        None => {
            let kind = declared_kind.unwrap_or(FormatKind::Unsupported);
            debug!("No signature matched; declared {:?} → {:?}", declared_mime, kind);
            kind
        }
    }
}

/// Lowercase, trim and strip parameters (`; charset=…`).
pub fn normalize_mime(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// Map a normalised MIME type onto a format. Generic and unknown types map to
/// `None`.
pub fn kind_for_mime(mime: &str) -> Option<FormatKind> {
    if mime.is_empty() || GENERIC_MIME.contains(&mime) {
        None
    } else if PDF_MIME.contains(&mime) {
        Some(FormatKind::Pdf)
    } else if RASTER_MIME.contains(&mime) {
        Some(FormatKind::RasterImage)
    } else if OFFICE_MIME.contains(&mime) {
        Some(FormatKind::OfficeDocument)
    } else {
        None
    }
}

/// Match the leading bytes against known signatures.
pub fn sniff(bytes: &[u8], extension: Option<&str>) -> Option<FormatKind> {
    if has_pdf_header(bytes) {
        return Some(FormatKind::Pdf);
    }

    if is_raster_signature(bytes) {
        return Some(FormatKind::RasterImage);
    }

    // OLE2 compound file: legacy .doc / .xls / .ppt
    if bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]) {
        return Some(FormatKind::OfficeDocument);
    }

    if bytes.starts_with(b"{\\rtf") {
        return Some(FormatKind::OfficeDocument);
    }

    // ZIP: OOXML and OpenDocument are ZIPs, but so are .jar, .epub and plain
    // archives. Only accept it with a recognisable member name near the
    // start, or an Office extension.
    if bytes.starts_with(b"PK\x03\x04") {
        if zip_head_names_office_member(bytes) {
            return Some(FormatKind::OfficeDocument);
        }
        if extension.is_some_and(|e| OFFICE_EXTENSIONS.contains(&e)) {
            return Some(FormatKind::OfficeDocument);
        }
    }

    None
}

/// `%PDF-` at the start, after at most a BOM and leading whitespace. Text
/// that merely mentions the header further in does not count.
fn has_pdf_header(bytes: &[u8]) -> bool {
    let rest = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let start = rest
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(rest.len());
    rest[start..].starts_with(b"%PDF-")
}

fn is_raster_signature(bytes: &[u8]) -> bool {
    bytes.starts_with(&[0xFF, 0xD8, 0xFF])
        || bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A])
        || bytes.starts_with(b"GIF87a")
        || bytes.starts_with(b"GIF89a")
        || (bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP")
        || (bytes.len() >= 14 && bytes.starts_with(b"BM"))
        || bytes.starts_with(b"II*\0")
        || bytes.starts_with(b"MM\0*")
}

fn zip_head_names_office_member(bytes: &[u8]) -> bool {
    const MARKERS: &[&[u8]] = &[
        b"[Content_Types].xml",
        b"word/",
        b"xl/",
        b"ppt/",
        b"mimetypeapplication/vnd.oasis.opendocument",
    ];
    let head = &bytes[..bytes.len().min(4096)];
    MARKERS
        .iter()
        .any(|m| head.windows(m.len()).any(|w| w == *m))
}
