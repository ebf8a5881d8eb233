//! # pdf2candidates
//!
//! Extract structured candidate records from scanned PDF listings.
//!
//! Search-result exports from professional-networking sites are often only
//! available as image PDFs. This crate rasterises each page, runs OCR on it,
//! and parses the recognised text into `{name, title, company, location,
//! industry}` records that can be shown as a table or exported to xlsx.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      validate path, or spill uploaded bytes to a temp file
//!  ├─ 2. Probe      check rasteriser + recognizer before any page work
//!  ├─ 3. Render     pdftoppm or pdfium (spawn_blocking)
//!  ├─ 4. Recognise  tesseract --psm N, or a vision LLM
//!  ├─ 5. Clean      line endings, invisible chars, noise phrases, blank runs
//!  ├─ 6. Extract    line grammar → CandidateRecord (never fails)
//!  └─ 7. Export     text table, candidates.xlsx, JSON
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2candidates::{convert, export, ExtractionConfig, Toolchain};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::builder()
//!         .toolchain(Toolchain::from_env())
//!         .build()?;
//!     let output = convert("search-results.pdf", &config).await?;
//!     if output.is_empty() {
//!         eprintln!("No candidates found.");
//!     } else {
//!         print!("{}", export::render_table(&output.records));
//!         export::write_xlsx(&output.records, export::XLSX_FILE_NAME).await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Text that is already recognised can go straight to the grammar:
//!
//! ```rust
//! let records = pdf2candidates::extract("Jane Doe - 1°\nSenior Recruiter\nAcme Corp - Staffing\n");
//! assert_eq!(records[0].industry, "Staffing");
//! assert_eq!(records[0].company, pdf2candidates::NOT_AVAILABLE);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2candidates` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! ## External tools
//!
//! | Backend | Needs |
//! |---------|-------|
//! | Poppler rasteriser (default) | `pdftoppm`, `pdfinfo` |
//! | Pdfium rasteriser | `libpdfium` |
//! | Tesseract recognizer (default) | `tesseract` + language data |
//! | Vision recognizer | an API key for an `edgequake-llm` provider |
//!
//! Locations come from [`Toolchain`]; [`check_toolchain`] reports what is
//! missing.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod export;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ExtractionConfig, ExtractionConfigBuilder, PageMarker, PageSegmentationMode, PageSelection,
    RasterizerKind, RecognizerKind, Toolchain,
};
pub use convert::{
    check_toolchain, convert, convert_from_bytes, convert_sync, convert_to_file, extract_text,
    inspect, ToolStatus, ToolchainReport,
};
pub use error::{PageError, Pdf2CandidatesError};
pub use export::{render_table, to_xlsx_bytes, write_xlsx, XLSX_FILE_NAME, XLSX_MIME_TYPE};
pub use extract::{
    extract, CandidateRecord, DegreePolicy, Grammar, GrammarConfig, FIELD_NAMES, NOT_AVAILABLE,
};
pub use output::{DocumentMetadata, ExtractionOutput, ExtractionStats, PageText};
pub use pipeline::recognize::{RecognizedText, TesseractRecognizer, TextRecognizer};
pub use pipeline::render::{PdfiumRasterizer, PopplerRasterizer, Rasterizer};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
