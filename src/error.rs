//! Error types for the pdf2candidates library.
//!
//! Two error types reflect two failure modes:
//!
//! * [`Pdf2CandidatesError`]: **Fatal**: the pipeline cannot run at all
//!   (bad input file, OCR toolchain missing, provider not configured).
//!   Returned as `Err(..)` from the top-level `convert*` functions. When the
//!   toolchain is missing nothing is rasterised or recognised.
//!
//! * [`PageError`]: **Non-fatal**: one page failed to render or recognise
//!   but the others are fine. Stored inside [`crate::output::PageText`] so
//!   the extractor still sees every page that did produce text.
//!
//! Finding zero candidates is neither: it is a valid outcome reported by
//! [`crate::output::ExtractionOutput::is_empty`]. The record extractor itself
//! has no error type because it never fails.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2candidates library.
#[derive(Debug, Error)]
pub enum Pdf2CandidatesError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The bytes are not a PDF, or the PDF structure cannot be parsed.
    #[error("'{path}' is not a valid PDF: {detail}")]
    MalformedInput { path: PathBuf, detail: String },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The page selection matched no page of the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// The rasteriser failed on a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── Toolchain errors ──────────────────────────────────────────────────
    /// The OCR or rasterisation backend cannot be located or invoked.
    #[error("{tool} is not available: {detail}\n{hint}")]
    ToolchainUnavailable {
        tool: String,
        detail: String,
        hint: String,
    },

    /// The vision recognizer has no usable LLM provider.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Every page failed; there is no text to extract from.
    #[error("All {total} pages failed to produce text.\nFirst error: {first_error}")]
    AllPagesFailed { total: usize, first_error: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The spreadsheet writer rejected the data.
    #[error("Failed to build spreadsheet: {0}")]
    ExportFailed(String),

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Pdf2CandidatesError {
    /// Shorthand for a [`Pdf2CandidatesError::ToolchainUnavailable`].
    pub fn toolchain(
        tool: impl Into<String>,
        detail: impl Into<String>,
        hint: impl Into<String>,
    ) -> Self {
        Self::ToolchainUnavailable {
            tool: tool.into(),
            detail: detail.into(),
            hint: hint.into(),
        }
    }
}

/// A non-fatal error for a single page.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Page rasterisation failed.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The recognizer returned an error (after retries, for the vision backend).
    #[error("Page {page}: text recognition failed: {detail}")]
    RecognitionFailed { page: usize, detail: String },

    /// The recognizer did not answer in time.
    #[error("Page {page}: text recognition timed out after {secs}s")]
    Timeout { page: usize, secs: u64 },
}

impl PageError {
    /// 1-indexed page the error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::RenderFailed { page, .. }
            | PageError::RecognitionFailed { page, .. }
            | PageError::Timeout { page, .. } => *page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toolchain_display_mentions_tool_and_hint() {
        let e = Pdf2CandidatesError::toolchain(
            "tesseract",
            "No such file or directory",
            "Install tesseract-ocr or set PDF2CANDIDATES_TESSERACT.",
        );
        let msg = e.to_string();
        assert!(msg.contains("tesseract is not available"), "got: {msg}");
        assert!(msg.contains("PDF2CANDIDATES_TESSERACT"), "got: {msg}");
    }

    #[test]
    fn malformed_input_display() {
        let e = Pdf2CandidatesError::MalformedInput {
            path: PathBuf::from("upload.pdf"),
            detail: "first bytes are [80, 75, 3, 4]".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("upload.pdf"));
        assert!(msg.contains("not a valid PDF"));
    }

    #[test]
    fn all_pages_failed_display() {
        let e = Pdf2CandidatesError::AllPagesFailed {
            total: 4,
            first_error: "Page 1: text recognition failed: exit 1".into(),
        };
        assert!(e.to_string().contains("All 4 pages"));
    }

    #[test]
    fn page_error_reports_its_page() {
        let e = PageError::Timeout { page: 7, secs: 60 };
        assert_eq!(e.page(), 7);
        assert!(e.to_string().contains("60s"));
    }
}
