//! Input resolution: turn a CLI path or URL into an [`UploadedFile`].
//!
//! Local files carry no declared MIME type, so detection is by signature
//! alone. For URLs the response's `Content-Type` plays the role of the
//! client-declared type and `Content-Length` the declared size, the same
//! untrusted metadata a web upload carries.
//!
//! Neither path buffers more than `max_input_bytes`: local files are checked
//! by metadata before being read, and downloads are abandoned as soon as the
//! body crosses the limit.

use crate::config::SplitConfig;
use crate::error::InputError;
use crate::output::UploadedFile;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a local path or HTTP(S) URL into an upload.
pub async fn resolve_input(input: &str, config: &SplitConfig) -> Result<UploadedFile, InputError> {
    if input.trim().is_empty() {
        return Err(InputError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, config).await
    } else {
        read_local(Path::new(input), config.max_input_bytes).await
    }
}

async fn read_local(path: &Path, max_bytes: u64) -> Result<UploadedFile, InputError> {
    let metadata = tokio::fs::metadata(path).await.map_err(|e| io_error(path, e))?;
    if !metadata.is_file() {
        return Err(InputError::InvalidInput {
            input: path.display().to_string(),
        });
    }
    if metadata.len() > max_bytes {
        return Err(InputError::TooLarge {
            input: path.display().to_string(),
            max: max_bytes,
        });
    }

    let bytes = tokio::fs::read(path).await.map_err(|e| io_error(path, e))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    debug!("Read local file {} ({} bytes)", path.display(), bytes.len());
    Ok(UploadedFile::new(bytes, file_name, None).with_declared_size(metadata.len()))
}

fn io_error(path: &Path, e: std::io::Error) -> InputError {
    let path: PathBuf = path.to_path_buf();
    match e.kind() {
        std::io::ErrorKind::NotFound => InputError::FileNotFound { path },
        std::io::ErrorKind::PermissionDenied => InputError::PermissionDenied { path },
        _ => InputError::ReadFailed { path, source: e },
    }
}

async fn download_url(url: &str, config: &SplitConfig) -> Result<UploadedFile, InputError> {
    let parsed = reqwest::Url::parse(url).map_err(|_| InputError::InvalidInput {
        input: url.to_string(),
    })?;
    info!("Downloading: {}", url);

    let timeout_secs = config.download_timeout_secs;
    let max_bytes = config.max_input_bytes;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| InputError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let request_error = |e: reqwest::Error| {
        if e.is_timeout() {
            InputError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            InputError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let mut response = client.get(parsed.clone()).send().await.map_err(request_error)?;
    if !response.status().is_success() {
        return Err(InputError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let too_large = || InputError::TooLarge {
        input: url.to_string(),
        max: max_bytes,
    };
    let declared_size = response.content_length();
    if declared_size.is_some_and(|len| len > max_bytes) {
        return Err(too_large());
    }

    let mime = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let file_name = response
        .headers()
        .get(reqwest::header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .and_then(filename_from_disposition)
        .or_else(|| filename_from_url(&parsed))
        .unwrap_or_else(|| "download".to_string());

    let mut body = Vec::with_capacity(declared_size.unwrap_or(0) as usize);
    while let Some(chunk) = response.chunk().await.map_err(request_error)? {
        if (body.len() + chunk.len()) as u64 > max_bytes {
            return Err(too_large());
        }
        body.extend_from_slice(&chunk);
    }

    info!("Downloaded {} ({} bytes, {:?})", file_name, body.len(), mime);
    let size = declared_size.unwrap_or(body.len() as u64);
    Ok(UploadedFile::new(body, file_name, mime).with_declared_size(size))
}

/// `filename="report.pdf"` or `filename=report.pdf` from a
/// `Content-Disposition` header.
fn filename_from_disposition(header: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|v| v.trim_matches('"').trim().to_string())
        .filter(|v| !v.is_empty())
}

fn filename_from_url(url: &reqwest::Url) -> Option<String> {
    url.path_segments()?
        .next_back()
        .filter(|last| !last.is_empty())
        .map(str::to_string)
}
