//! Office documents → PDF via LibreOffice headless, then rendered like any PDF.
//!
//! Each invocation runs in its own [`tempfile::TempDir`] holding the source
//! file, the produced PDF and a private LibreOffice profile. A shared profile
//! is locked by the first running `soffice`, so concurrent conversions would
//! otherwise fail or serialise. The directory is removed when the converter
//! returns, whichever way it returns.

use crate::config::SplitConfig;
use crate::error::{ConversionError, SplitError};
use crate::pipeline::detect::OFFICE_EXTENSIONS;
use crate::pipeline::render::PdfConverter;
use crate::pipeline::{PageConverter, RawPage};
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, info};

/// Converter for [`crate::FormatKind::OfficeDocument`].
pub struct OfficeConverter<'a> {
    config: &'a SplitConfig,
    extension: Option<String>,
}

impl<'a> OfficeConverter<'a> {
    /// `extension` is the upload's filename extension; LibreOffice picks its
    /// import filter from it.
    pub fn new(config: &'a SplitConfig, extension: Option<String>) -> Self {
        Self { config, extension }
    }

    /// Run the office converter and return the produced PDF bytes.
    ///
    /// The produced PDF counts against `max_input_bytes` like an upload.
    pub async fn normalize(&self, input: &[u8]) -> Result<Vec<u8>, SplitError> {
        let start = Instant::now();
        let converter = self.config.office_converter.display().to_string();

        let workdir = tempfile::TempDir::new()
            .map_err(|e| ConversionError::normalize(format!("cannot create temp dir: {e}")))?;
        let ext = source_extension(self.extension.as_deref(), input);
        let source = workdir.path().join(format!("source.{ext}"));
        tokio::fs::write(&source, input)
            .await
            .map_err(|e| ConversionError::normalize(format!("cannot write source file: {e}")))?;

        let profile = workdir.path().join("profile");
        let profile_url = reqwest::Url::from_directory_path(&profile).map_err(|_| {
            ConversionError::normalize(format!("profile path {} is not absolute", profile.display()))
        })?;

        let mut cmd = Command::new(&self.config.office_converter);
        cmd.arg(format!("-env:UserInstallation={profile_url}"))
            .args(["--headless", "--norestore", "--convert-to", "pdf", "--outdir"])
            .arg(workdir.path())
            .arg(&source)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        debug!("Running {} on source.{}", converter, ext);

        let timeout = Duration::from_secs(self.config.normalize_timeout_secs);
        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ConversionError::normalize(format!(
                    "failed to start {converter}: {e}"
                ))
                .into())
            }
            Err(_) => {
                return Err(ConversionError::normalize(format!(
                    "{converter} timed out after {}s",
                    timeout.as_secs()
                ))
                .into())
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ConversionError::normalize(format!(
                "{converter} exited with {}: {}",
                output.status,
                tail(stderr.trim(), 500)
            ))
            .into());
        }

        let pdf = read_converted_pdf(
            &workdir.path().join("source.pdf"),
            &converter,
            self.config.max_input_bytes,
        )
        .await?;

        info!(
            "Normalised {} bytes of .{} to {} bytes of PDF in {}ms",
            input.len(),
            ext,
            pdf.len(),
            start.elapsed().as_millis()
        );
        Ok(pdf)
    }
}

impl PageConverter for OfficeConverter<'_> {
    async fn convert(&self, input: Arc<[u8]>) -> Result<Vec<RawPage>, SplitError> {
        let pdf = self.normalize(&input).await?;
        drop(input);
        PdfConverter::new(self.config).convert(Arc::from(pdf)).await
    }
}

/// Read the converter's PDF, refusing anything larger than `max_bytes`.
async fn read_converted_pdf(path: &Path, converter: &str, max_bytes: u64) -> Result<Vec<u8>, SplitError> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|_| ConversionError::normalize(format!("{converter} produced no PDF output")))?;
    let size = file
        .metadata()
        .await
        .map_err(|e| ConversionError::normalize(format!("cannot stat {converter} output: {e}")))?
        .len();
    if size > max_bytes {
        return Err(SplitError::InputTooLarge { size, max: max_bytes });
    }

    // The file may still grow after the stat; never read past the cap.
    let mut pdf = Vec::with_capacity(size as usize);
    file.take(max_bytes.saturating_add(1))
        .read_to_end(&mut pdf)
        .await
        .map_err(|e| ConversionError::normalize(format!("cannot read {converter} output: {e}")))?;
    if pdf.len() as u64 > max_bytes {
        return Err(SplitError::InputTooLarge {
            size: pdf.len() as u64,
            max: max_bytes,
        });
    }
    if !pdf.starts_with(b"%PDF-") {
        return Err(ConversionError::normalize(format!("{converter} output is not a PDF")).into());
    }
    Ok(pdf)
}

/// Extension for the temp source file: the upload's own when it names an
/// office format, otherwise inferred from the container signature.
fn source_extension<'e>(declared: Option<&'e str>, bytes: &[u8]) -> &'e str {
    match declared {
        Some(ext) if OFFICE_EXTENSIONS.contains(&ext) => ext,
        _ if bytes.starts_with(b"{\\rtf") => "rtf",
        _ if bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0]) => "doc",
        _ => "docx",
    }
}

fn tail(s: &str, max_chars: usize) -> &str {
    let count = s.chars().count();
    if count <= max_chars {
        return s;
    }
    let skip = count - max_chars;
    s.char_indices().nth(skip).map_or(s, |(i, _)| &s[i..])
}
