//! Text recognition: page image + segmentation mode → raw text.
//!
//! [`TesseractRecognizer`] runs the `tesseract` executable on a temporary
//! PNG. The vision backend lives in [`super::llm`]; both sit behind the
//! [`TextRecognizer`] trait so the pipeline does not care which one runs.

use crate::config::{PageSegmentationMode, Toolchain};
use crate::error::{PageError, Pdf2CandidatesError};
use async_trait::async_trait;
use image::DynamicImage;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::debug;

/// Text produced for one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecognizedText {
    pub text: String,
    /// Prompt tokens, when the backend reports them.
    pub input_tokens: usize,
    /// Completion tokens, when the backend reports them.
    pub output_tokens: usize,
}

impl RecognizedText {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Turns a page image into text.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Short backend name for logs and the toolchain report.
    fn name(&self) -> &str;

    /// Check the backend can be invoked. Returns a one-line description
    /// (version or provider) on success.
    async fn ensure_available(&self) -> Result<String, Pdf2CandidatesError>;

    /// Recognise page `page_num` (1-indexed).
    async fn recognize(
        &self,
        page_num: usize,
        image: DynamicImage,
        psm: PageSegmentationMode,
    ) -> Result<RecognizedText, PageError>;
}

/// Recognizer backed by the `tesseract` executable.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    executable: PathBuf,
    language: Option<String>,
    timeout: Duration,
}

impl TesseractRecognizer {
    /// Default wall-clock limit for a single page.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

    pub fn new(toolchain: &Toolchain, language: Option<String>) -> Self {
        Self {
            executable: toolchain.tesseract.clone(),
            language: language.filter(|l| !l.trim().is_empty()),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn args(&self, psm: PageSegmentationMode) -> Vec<String> {
        let mut args = vec![
            "stdout".to_string(),
            "--psm".to_string(),
            psm.as_number().to_string(),
        ];
        if let Some(lang) = &self.language {
            args.push("-l".to_string());
            args.push(lang.clone());
        }
        args
    }
}

#[async_trait]
impl TextRecognizer for TesseractRecognizer {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn ensure_available(&self) -> Result<String, Pdf2CandidatesError> {
        let output = Command::new(&self.executable)
            .arg("--version")
            .output()
            .await
            .map_err(|e| {
                Pdf2CandidatesError::toolchain(
                    self.executable.display().to_string(),
                    e.to_string(),
                    "Install tesseract-ocr or set PDF2CANDIDATES_TESSERACT to its executable.",
                )
            })?;

        if !output.status.success() {
            return Err(Pdf2CandidatesError::toolchain(
                self.executable.display().to_string(),
                format!("`--version` exited with {}", output.status),
                "Check the tesseract installation.",
            ));
        }

        // Older releases print the banner on stderr.
        let banner = [&output.stdout, &output.stderr].into_iter().find_map(|bytes| {
            let text = String::from_utf8_lossy(bytes);
            let first = text.lines().next()?.trim();
            (!first.is_empty()).then(|| first.to_string())
        });
        Ok(banner.unwrap_or_else(|| self.executable.display().to_string()))
    }

    async fn recognize(
        &self,
        page_num: usize,
        image: DynamicImage,
        psm: PageSegmentationMode,
    ) -> Result<RecognizedText, PageError> {
        let failed = |detail: String| PageError::RecognitionFailed {
            page: page_num,
            detail,
        };

        let png = tokio::task::spawn_blocking(move || write_png(&image))
            .await
            .map_err(|e| failed(format!("encode task panicked: {e}")))?
            .map_err(failed)?;

        let mut cmd = Command::new(&self.executable);
        cmd.arg(png.path()).args(self.args(psm)).kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| PageError::Timeout {
                page: page_num,
                secs: self.timeout.as_secs(),
            })?
            .map_err(|e| failed(format!("failed to invoke {}: {e}", self.executable.display())))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(failed(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("Page {}: tesseract produced {} bytes", page_num, text.len());
        Ok(RecognizedText::plain(text))
    }
}

fn write_png(image: &DynamicImage) -> Result<NamedTempFile, String> {
    let file = tempfile::Builder::new()
        .prefix("pdf2candidates-page-")
        .suffix(".png")
        .tempfile()
        .map_err(|e| format!("tempfile: {e}"))?;
    image
        .save_with_format(file.path(), image::ImageFormat::Png)
        .map_err(|e| format!("PNG encode: {e}"))?;
    Ok(file)
}
