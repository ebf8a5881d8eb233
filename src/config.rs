//! Configuration types for candidate extraction.
//!
//! All pipeline behaviour is controlled through [`ExtractionConfig`], built
//! via [`ExtractionConfigBuilder`]. The external tools the pipeline shells
//! out to are described by an explicit [`Toolchain`] value inside the
//! config; nothing below the entry points reads the environment.

use crate::error::Pdf2CandidatesError;
use crate::extract::{DegreePolicy, GrammarConfig};
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// DPI used when the caller does not choose one.
pub const DEFAULT_DPI: u32 = 200;

/// Configuration for one extraction run.
///
/// # Example
/// ```rust
/// use pdf2candidates::{ExtractionConfig, PageSegmentationMode};
///
/// let config = ExtractionConfig::builder()
///     .dpi(300)
///     .psm(PageSegmentationMode::Auto)
///     .language("ita+eng")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Rendering DPI. `None` uses [`DEFAULT_DPI`].
    ///
    /// Passed to the rasteriser as-is; higher values trade time for OCR
    /// accuracy.
    pub dpi: Option<u32>,

    /// Tesseract page segmentation mode. Default: [`PageSegmentationMode::SingleBlock`].
    pub psm: PageSegmentationMode,

    /// Tesseract language(s), e.g. "eng" or "ita+eng". `None` uses tesseract's default.
    pub language: Option<String>,

    /// Which backend turns PDF pages into images. Default: Poppler.
    pub rasterizer: RasterizerKind,

    /// Which backend turns page images into text. Default: Tesseract.
    pub recognizer: RecognizerKind,

    /// Locations of the external tools.
    pub toolchain: Toolchain,

    /// Pages recognised at once. Default: 1 (strictly sequential).
    ///
    /// Page order of the concatenated text does not depend on this value.
    pub concurrency: usize,

    /// Page selection. Default: All pages.
    pub pages: PageSelection,

    /// Marker inserted between pages of the concatenated text. Default: Numbered.
    pub page_marker: PageMarker,

    /// Record grammar and text cleanup settings.
    pub grammar: GrammarConfig,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    // ── Vision recognizer ─────────────────────────────────────────────────
    /// LLM model identifier for the vision recognizer.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for transcription. Default: 0.0.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate per page. Default: 4096.
    pub max_tokens: usize,

    /// Retries per page on a failed LLM call. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-call LLM timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Wall-clock limit for one tesseract run, in seconds. Default: 120.
    pub ocr_timeout_secs: u64,

    /// Receives per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            dpi: None,
            psm: PageSegmentationMode::default(),
            language: None,
            rasterizer: RasterizerKind::default(),
            recognizer: RecognizerKind::default(),
            toolchain: Toolchain::default(),
            concurrency: 1,
            pages: PageSelection::default(),
            page_marker: PageMarker::default(),
            grammar: GrammarConfig::default(),
            password: None,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.0,
            max_tokens: 4096,
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            ocr_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("dpi", &self.dpi)
            .field("psm", &self.psm)
            .field("language", &self.language)
            .field("rasterizer", &self.rasterizer)
            .field("recognizer", &self.recognizer)
            .field("toolchain", &self.toolchain)
            .field("concurrency", &self.concurrency)
            .field("pages", &self.pages)
            .field("page_marker", &self.page_marker)
            .field("grammar", &self.grammar)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("ocr_timeout_secs", &self.ocr_timeout_secs)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn callback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The DPI actually handed to the rasteriser.
    pub fn effective_dpi(&self) -> u32 {
        self.dpi.unwrap_or(DEFAULT_DPI)
    }
}

/// Builder for [`ExtractionConfig`].
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl fmt::Debug for ExtractionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ExtractionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = Some(dpi);
        self
    }

    pub fn psm(mut self, psm: PageSegmentationMode) -> Self {
        self.config.psm = psm;
        self
    }

    pub fn language(mut self, lang: impl Into<String>) -> Self {
        self.config.language = Some(lang.into());
        self
    }

    pub fn rasterizer(mut self, kind: RasterizerKind) -> Self {
        self.config.rasterizer = kind;
        self
    }

    pub fn recognizer(mut self, kind: RecognizerKind) -> Self {
        self.config.recognizer = kind;
        self
    }

    pub fn toolchain(mut self, toolchain: Toolchain) -> Self {
        self.config.toolchain = toolchain;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn page_marker(mut self, marker: PageMarker) -> Self {
        self.config.page_marker = marker;
        self
    }

    pub fn grammar(mut self, grammar: GrammarConfig) -> Self {
        self.config.grammar = grammar;
        self
    }

    pub fn degree_policy(mut self, policy: DegreePolicy) -> Self {
        self.config.grammar.degree_policy = policy;
        self
    }

    pub fn noise_phrases(mut self, phrases: Vec<String>) -> Self {
        self.config.grammar.noise_phrases = phrases;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn ocr_timeout_secs(mut self, secs: u64) -> Self {
        self.config.ocr_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// DPI is deliberately not range-checked; the rasteriser decides what it
    /// accepts.
    pub fn build(self) -> Result<ExtractionConfig, Pdf2CandidatesError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(Pdf2CandidatesError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.grammar.placeholder.trim().is_empty() {
            return Err(Pdf2CandidatesError::InvalidConfig(
                "Placeholder must not be blank".into(),
            ));
        }
        if c.ocr_timeout_secs == 0 {
            return Err(Pdf2CandidatesError::InvalidConfig(
                "OCR timeout must be ≥ 1 second".into(),
            ));
        }
        if let PageSegmentationMode::Other(n) = c.psm {
            if n > 13 {
                return Err(Pdf2CandidatesError::InvalidConfig(format!(
                    "Page segmentation mode must be 0–13, got {n}"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Tesseract page segmentation mode (`--psm`).
///
/// The source listings are column-like blocks of short lines. `SingleBlock`
/// keeps each listing's lines together; `Auto` recovers more text on busy
/// pages at the cost of splitting blocks with blank lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageSegmentationMode {
    /// Fully automatic page segmentation (3).
    Auto,
    /// A single column of text of variable sizes (4).
    SingleColumn,
    /// A single uniform block of text (6). (default)
    #[default]
    SingleBlock,
    /// As much text as possible in no particular order (11).
    SparseText,
    /// Any other tesseract mode number.
    Other(u8),
}

impl PageSegmentationMode {
    /// The numeric value passed to `tesseract --psm`.
    pub fn as_number(&self) -> u8 {
        match self {
            PageSegmentationMode::Auto => 3,
            PageSegmentationMode::SingleColumn => 4,
            PageSegmentationMode::SingleBlock => 6,
            PageSegmentationMode::SparseText => 11,
            PageSegmentationMode::Other(n) => *n,
        }
    }

    /// Inverse of [`Self::as_number`].
    pub fn from_number(n: u8) -> Self {
        match n {
            3 => PageSegmentationMode::Auto,
            4 => PageSegmentationMode::SingleColumn,
            6 => PageSegmentationMode::SingleBlock,
            11 => PageSegmentationMode::SparseText,
            other => PageSegmentationMode::Other(other),
        }
    }

    /// True for modes that treat the page as one block of text.
    pub fn is_single_block(&self) -> bool {
        matches!(
            self,
            PageSegmentationMode::SingleBlock | PageSegmentationMode::SingleColumn
        )
    }
}

/// Backend that renders PDF pages to images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RasterizerKind {
    /// `pdftoppm` / `pdfinfo` from poppler-utils. (default)
    #[default]
    Poppler,
    /// The pdfium library through `pdfium-render`.
    Pdfium,
}

/// Backend that turns page images into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RecognizerKind {
    /// The `tesseract` executable. (default)
    #[default]
    Tesseract,
    /// A vision LLM transcribing the page.
    Vision,
}

/// Where the external tools live.
///
/// Resolved once at process start (see [`Toolchain::from_env`]) and carried
/// inside [`ExtractionConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toolchain {
    /// `tesseract` executable.
    pub tesseract: PathBuf,
    /// `pdftoppm` executable.
    pub pdftoppm: PathBuf,
    /// `pdfinfo` executable.
    pub pdfinfo: PathBuf,
    /// pdfium shared library, or a directory containing it. `None` binds to
    /// the system library.
    pub pdfium_lib: Option<PathBuf>,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            tesseract: PathBuf::from("tesseract"),
            pdftoppm: PathBuf::from("pdftoppm"),
            pdfinfo: PathBuf::from("pdfinfo"),
            pdfium_lib: None,
        }
    }
}

impl Toolchain {
    /// Environment variable overriding the tesseract executable.
    pub const TESSERACT_ENV: &'static str = "PDF2CANDIDATES_TESSERACT";
    /// Environment variable naming the directory holding poppler's binaries.
    pub const POPPLER_DIR_ENV: &'static str = "PDF2CANDIDATES_POPPLER_DIR";
    /// Environment variable naming the pdfium library (or its directory).
    pub const PDFIUM_ENV: &'static str = "PDFIUM_LIB_PATH";

    /// Resolve tool locations from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve tool locations through `lookup`, with `PATH` defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut toolchain = Self::default();

        if let Some(tesseract) = non_empty(Self::TESSERACT_ENV) {
            toolchain.tesseract = PathBuf::from(tesseract);
        }
        if let Some(dir) = non_empty(Self::POPPLER_DIR_ENV) {
            toolchain = toolchain.with_poppler_dir(dir);
        }
        toolchain.pdfium_lib = non_empty(Self::PDFIUM_ENV).map(PathBuf::from);
        toolchain
    }

    /// Point `pdftoppm` and `pdfinfo` at a poppler `bin` directory.
    pub fn with_poppler_dir(mut self, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        self.pdftoppm = dir.join(executable_name("pdftoppm"));
        self.pdfinfo = dir.join(executable_name("pdfinfo"));
        self
    }
}

fn executable_name(stem: &str) -> String {
    if cfg!(windows) {
        format!("{stem}.exe")
    } else {
        stem.to_string()
    }
}

/// Specifies which pages of the PDF to process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum PageSelection {
    /// All pages (default).
    #[default]
    All,
    /// A single page (1-indexed).
    Single(usize),
    /// A contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

/// How pages are separated in the concatenated OCR text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum PageMarker {
    /// Pages joined with a single newline.
    None,
    /// `--- Page N ---` before every page. (default)
    #[default]
    Numbered,
}

impl PageMarker {
    /// Text placed before page `page_num` (1-indexed).
    pub fn render(&self, page_num: usize) -> String {
        match self {
            PageMarker::None => String::new(),
            PageMarker::Numbered => format!("--- Page {page_num} ---\n"),
        }
    }
}
