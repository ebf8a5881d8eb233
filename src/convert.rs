//! Pipeline entry points.
//!
//! [`convert`] runs the whole pipeline on a PDF path; [`convert_from_bytes`]
//! does the same for an uploaded buffer. [`extract_text`] skips OCR entirely
//! and runs the record grammar on text the caller already has.

use crate::config::{ExtractionConfig, PageMarker, RecognizerKind};
use crate::error::{PageError, Pdf2CandidatesError};
use crate::export;
use crate::extract::{CandidateRecord, Grammar};
use crate::output::{DocumentMetadata, ExtractionOutput, ExtractionStats, PageText};
use crate::pipeline::cleanup::clean_page_text;
use crate::pipeline::input::{self, ResolvedInput};
use crate::pipeline::llm::{VisionRecognizer, VisionSettings};
use crate::pipeline::recognize::{RecognizedText, TesseractRecognizer, TextRecognizer};
use crate::pipeline::render::{self, rasterizer_for, RenderedPages};
use edgequake_llm::{LLMProvider, ProviderFactory};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Model used by the vision recognizer when none is configured.
pub const DEFAULT_VISION_MODEL: &str = "gpt-4.1-nano";

/// Extract candidate records from a PDF file.
///
/// # Returns
/// `Ok(ExtractionOutput)` whenever at least one page produced text, even if
/// no candidates were found (check [`ExtractionOutput::is_empty`]) or some
/// pages failed (check `output.stats.failed_pages`).
///
/// # Errors
/// Only fatal errors:
/// - file not found, unreadable, or not a PDF
/// - OCR or rasterisation toolchain unavailable (checked before any page work)
/// - encrypted PDF without the right password
/// - every selected page failed
pub async fn convert(
    input_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Pdf2CandidatesError> {
    let input_path = input_path.as_ref();
    info!("Starting extraction: {}", input_path.display());
    let resolved = input::resolve_local(input_path)?;
    run(&resolved, config).await
}

/// Extract candidate records from PDF bytes held in memory.
///
/// The bytes are spilled to a managed temp file that is removed on return.
///
/// # Example
/// ```rust,no_run
/// use pdf2candidates::{convert_from_bytes, ExtractionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("search-results.pdf")?;
/// let output = convert_from_bytes(&bytes, &ExtractionConfig::default()).await?;
/// println!("{} candidates", output.records.len());
/// # Ok(())
/// # }
/// ```
pub async fn convert_from_bytes(
    bytes: &[u8],
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Pdf2CandidatesError> {
    info!("Starting extraction of {} byte upload", bytes.len());
    let resolved = input::resolve_bytes(bytes)?;
    run(&resolved, config).await
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Pdf2CandidatesError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2CandidatesError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(convert(input_path, config))
}

/// Extract candidates and write them to an xlsx file.
///
/// The workbook is written even when no candidates were found (header row
/// only); `stats.candidates` tells the caller which case occurred.
pub async fn convert_to_file(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionStats, Pdf2CandidatesError> {
    let output = convert(input_path, config).await?;
    export::write_xlsx(&output.records, output_path).await?;
    Ok(output.stats)
}

/// Run the cleanup rules and the record grammar on already-recognised text.
///
/// Needs no toolchain. Never fails; an empty vector means no candidates.
pub fn extract_text(text: &str, config: &ExtractionConfig) -> Vec<CandidateRecord> {
    let cleaned = clean_page_text(text, &config.grammar.noise_phrases);
    Grammar::new(&config.grammar).extract(&cleaned)
}

/// Read PDF metadata without recognising any page.
///
/// Needs only the configured rasteriser.
pub async fn inspect(
    input_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<DocumentMetadata, Pdf2CandidatesError> {
    let resolved = input::resolve_local(input_path)?;
    let rasterizer = rasterizer_for(config.rasterizer, &config.toolchain);
    render::extract_metadata(rasterizer, resolved.path(), config.password.as_deref()).await
}

// ── Toolchain probe ──────────────────────────────────────────────────────

/// Availability of one backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolStatus {
    /// Backend name ("poppler", "tesseract", ...).
    pub name: String,
    pub available: bool,
    /// Version banner when available, error message otherwise.
    pub detail: String,
}

impl ToolStatus {
    fn from_probe(name: &str, probe: Result<String, Pdf2CandidatesError>) -> Self {
        match probe {
            Ok(detail) => Self {
                name: name.to_string(),
                available: true,
                detail,
            },
            Err(e) => Self {
                name: name.to_string(),
                available: false,
                detail: e.to_string(),
            },
        }
    }
}

/// Result of [`check_toolchain`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolchainReport {
    pub rasterizer: ToolStatus,
    pub recognizer: ToolStatus,
}

impl ToolchainReport {
    /// True when both backends can run.
    pub fn is_ready(&self) -> bool {
        self.rasterizer.available && self.recognizer.available
    }
}

/// Probe the configured rasteriser and recognizer without touching a PDF.
pub async fn check_toolchain(config: &ExtractionConfig) -> ToolchainReport {
    let rasterizer = rasterizer_for(config.rasterizer, &config.toolchain);
    let rasterizer_name = rasterizer.name();
    let rasterizer_status =
        ToolStatus::from_probe(rasterizer_name, render::ensure_available(rasterizer).await);

    let recognizer_status = match build_recognizer(config) {
        Ok(recognizer) => {
            let probe = recognizer.ensure_available().await;
            ToolStatus::from_probe(recognizer.name(), probe)
        }
        Err(e) => ToolStatus::from_probe(recognizer_label(config.recognizer), Err(e)),
    };

    ToolchainReport {
        rasterizer: rasterizer_status,
        recognizer: recognizer_status,
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn run(
    resolved: &ResolvedInput,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Pdf2CandidatesError> {
    let total_start = Instant::now();
    let pdf_path = resolved.path();

    // ── Step 1: Probe the toolchain ──────────────────────────────────────
    let recognizer = build_recognizer(config)?;
    let rasterizer = rasterizer_for(config.rasterizer, &config.toolchain);
    let recognizer_version = recognizer.ensure_available().await?;
    let rasterizer_version = render::ensure_available(Arc::clone(&rasterizer)).await?;
    debug!(
        "Toolchain: {} ({}), {} ({})",
        rasterizer.name(),
        rasterizer_version,
        recognizer.name(),
        recognizer_version
    );

    // ── Step 2: Metadata and page selection ──────────────────────────────
    let metadata =
        render::extract_metadata(Arc::clone(&rasterizer), pdf_path, config.password.as_deref())
            .await?;
    let total_pages = metadata.page_count;
    info!("PDF has {} pages", total_pages);

    let page_indices = config.pages.to_indices(total_pages);
    if page_indices.is_empty() {
        return Err(Pdf2CandidatesError::PageOutOfRange {
            page: 0,
            total: total_pages,
        });
    }
    let selected = page_indices.len();
    debug!("Selected {} pages", selected);

    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_start(selected);
    }

    // ── Step 3: Rasterise ────────────────────────────────────────────────
    let render_start = Instant::now();
    let rendered = render::render_pages(
        rasterizer,
        pdf_path,
        config.effective_dpi(),
        &page_indices,
        config.password.as_deref(),
    )
    .await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    info!("Rendered {} pages in {}ms", rendered.len(), render_duration_ms);

    if let Some(PageError::RenderFailed { page, detail }) = first_render_failure(&rendered) {
        return Err(Pdf2CandidatesError::RasterisationFailed { page, detail });
    }

    // ── Step 4: Recognise ────────────────────────────────────────────────
    let recognize_start = Instant::now();
    let mut pages = process_concurrent(&recognizer, rendered, selected, config).await;
    let recognize_duration_ms = recognize_start.elapsed().as_millis() as u64;
    pages.sort_by_key(|p| p.page_num);

    let processed = pages.iter().filter(|p| p.is_ok()).count();
    let failed = pages.len() - processed;
    if processed == 0 {
        let first_error = pages
            .iter()
            .find_map(|p| p.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(Pdf2CandidatesError::AllPagesFailed {
            total: pages.len(),
            first_error,
        });
    }

    // ── Step 5: Concatenate and extract ──────────────────────────────────
    let raw_text = assemble_text(&pages, &config.page_marker);
    let records = Grammar::new(&config.grammar).extract(&raw_text);

    let stats = ExtractionStats {
        total_pages,
        processed_pages: processed,
        failed_pages: failed,
        skipped_pages: selected.saturating_sub(pages.len()),
        candidates: records.len(),
        total_input_tokens: pages.iter().map(|p| p.input_tokens as u64).sum(),
        total_output_tokens: pages.iter().map(|p| p.output_tokens as u64).sum(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        render_duration_ms,
        recognize_duration_ms,
    };

    info!(
        "Extraction complete: {} candidates from {}/{} pages, {}ms total",
        records.len(),
        processed,
        selected,
        stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_complete(selected, records.len());
    }

    Ok(ExtractionOutput {
        records,
        pages,
        metadata,
        raw_text,
        stats,
    })
}

fn recognizer_label(kind: RecognizerKind) -> &'static str {
    match kind {
        RecognizerKind::Tesseract => "tesseract",
        RecognizerKind::Vision => "vision",
    }
}

fn build_recognizer(
    config: &ExtractionConfig,
) -> Result<Arc<dyn TextRecognizer>, Pdf2CandidatesError> {
    match config.recognizer {
        RecognizerKind::Tesseract => Ok(Arc::new(
            TesseractRecognizer::new(&config.toolchain, config.language.clone())
                .with_timeout(Duration::from_secs(config.ocr_timeout_secs)),
        )),
        RecognizerKind::Vision => {
            let (provider, label) = resolve_provider(config)?;
            Ok(Arc::new(VisionRecognizer::new(
                provider,
                label,
                VisionSettings::from(config),
            )))
        }
    }
}

/// Resolve the vision provider, from most-specific to least-specific:
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider** (`config.provider_name`) with `config.model` or
///    [`DEFAULT_VISION_MODEL`]; the factory reads that provider's API key.
/// 3. **Auto-detection** via [`ProviderFactory::from_env`].
fn resolve_provider(
    config: &ExtractionConfig,
) -> Result<(Arc<dyn LLMProvider>, String), Pdf2CandidatesError> {
    if let Some(ref provider) = config.provider {
        return Ok((Arc::clone(provider), "custom provider".to_string()));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_VISION_MODEL);
        let provider = ProviderFactory::create_llm_provider(name, model).map_err(|e| {
            Pdf2CandidatesError::ProviderNotConfigured {
                provider: name.clone(),
                hint: format!("{e}"),
            }
        })?;
        return Ok((provider, format!("{name}/{model}")));
    }

    let (provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| Pdf2CandidatesError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No vision provider could be auto-detected from the environment.\n\
                Set OPENAI_API_KEY or ANTHROPIC_API_KEY, or pass --provider.\n\
                Error: {e}"
            ),
        })?;
    Ok((provider, "auto-detected provider".to_string()))
}

/// Recognise rendered pages, at most `config.concurrency` at a time.
///
/// Pages come back in completion order; the caller sorts them.
async fn process_concurrent(
    recognizer: &Arc<dyn TextRecognizer>,
    rendered: RenderedPages,
    total_pages: usize,
    config: &ExtractionConfig,
) -> Vec<PageText> {
    stream::iter(rendered.into_iter().map(|(idx, image)| {
        let recognizer = Arc::clone(recognizer);
        let page_num = idx + 1;
        async move {
            let start = Instant::now();
            let result = match image {
                Ok(image) => {
                    if let Some(ref cb) = config.progress_callback {
                        cb.on_page_start(page_num, total_pages);
                    }
                    recognizer.recognize(page_num, image, config.psm).await
                }
                Err(e) => Err(e),
            };
            let duration_ms = start.elapsed().as_millis() as u64;
            let page = finish_page(page_num, duration_ms, result, config);

            if let Some(ref cb) = config.progress_callback {
                match &page.error {
                    None => cb.on_page_complete(page_num, total_pages, page.text.len()),
                    Some(e) => cb.on_page_error(page_num, total_pages, &e.to_string()),
                }
            }
            page
        }
    }))
    .buffer_unordered(config.concurrency.max(1))
    .collect()
    .await
}

/// The first page error when no page rendered at all.
fn first_render_failure(rendered: &RenderedPages) -> Option<PageError> {
    if rendered.iter().any(|(_, image)| image.is_ok()) {
        return None;
    }
    rendered.iter().find_map(|(_, image)| image.as_ref().err().cloned())
}

fn finish_page(
    page_num: usize,
    duration_ms: u64,
    result: Result<RecognizedText, PageError>,
    config: &ExtractionConfig,
) -> PageText {
    match result {
        Ok(recognized) => PageText {
            page_num,
            text: clean_page_text(&recognized.text, &config.grammar.noise_phrases),
            input_tokens: recognized.input_tokens,
            output_tokens: recognized.output_tokens,
            duration_ms,
            error: None,
        },
        Err(e) => {
            warn!("{e}");
            PageText::failed(page_num, duration_ms, e)
        }
    }
}

/// Join successful pages in order, each preceded by its page marker.
fn assemble_text(pages: &[PageText], marker: &PageMarker) -> String {
    let mut text = String::new();
    for page in pages.iter().filter(|p| p.is_ok()) {
        text.push_str(&marker.render(page.page_num));
        text.push_str(&page.text);
        text.push('\n');
    }
    text
}
