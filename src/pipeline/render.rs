//! PDF rasterisation: render selected pages to `DynamicImage`.
//!
//! Two backends implement [`Rasterizer`]:
//!
//! * [`PopplerRasterizer`] shells out to `pdftoppm` / `pdfinfo`. This is the
//!   default and matches what the OCR toolchain is usually installed with.
//! * [`PdfiumRasterizer`] renders in-process through `pdfium-render`.
//!
//! Both are blocking. The async helpers at the bottom of this module move the
//! work onto `spawn_blocking` so tokio worker threads never stall on a
//! subprocess or on pdfium.

use crate::config::{RasterizerKind, Toolchain};
use crate::error::{PageError, Pdf2CandidatesError};
use crate::output::DocumentMetadata;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Pages rendered for one run, in the order requested.
///
/// A failed page carries a [`PageError`] instead of an image; the pipeline
/// carries on with the others.
pub type RenderedPages = Vec<(usize, Result<DynamicImage, PageError>)>;

/// Turns PDF pages into images.
pub trait Rasterizer: Send + Sync {
    /// Short backend name for logs and the toolchain report.
    fn name(&self) -> &'static str;

    /// Check the backend can be invoked. Returns a one-line description
    /// (version or library location) on success.
    fn ensure_available(&self) -> Result<String, Pdf2CandidatesError>;

    /// Read document metadata, including the page count.
    fn metadata(
        &self,
        pdf: &Path,
        password: Option<&str>,
    ) -> Result<DocumentMetadata, Pdf2CandidatesError>;

    /// Render `page_indices` (0-based) at `dpi`, preserving their order.
    fn rasterize(
        &self,
        pdf: &Path,
        dpi: u32,
        page_indices: &[usize],
        password: Option<&str>,
    ) -> RenderedPages;
}

/// Build the rasteriser selected in the config.
pub fn rasterizer_for(kind: RasterizerKind, toolchain: &Toolchain) -> Arc<dyn Rasterizer> {
    match kind {
        RasterizerKind::Poppler => Arc::new(PopplerRasterizer::new(toolchain)),
        RasterizerKind::Pdfium => Arc::new(PdfiumRasterizer::new(toolchain.pdfium_lib.clone())),
    }
}

// ── Poppler ──────────────────────────────────────────────────────────────────

/// Rasteriser backed by poppler-utils.
#[derive(Debug, Clone)]
pub struct PopplerRasterizer {
    pdftoppm: PathBuf,
    pdfinfo: PathBuf,
}

impl PopplerRasterizer {
    pub fn new(toolchain: &Toolchain) -> Self {
        Self {
            pdftoppm: toolchain.pdftoppm.clone(),
            pdfinfo: toolchain.pdfinfo.clone(),
        }
    }

    fn probe(&self, exe: &Path) -> Result<String, Pdf2CandidatesError> {
        let output = Command::new(exe).arg("-v").output().map_err(|e| {
            Pdf2CandidatesError::toolchain(
                exe.display().to_string(),
                e.to_string(),
                "Install poppler-utils or set PDF2CANDIDATES_POPPLER_DIR to its bin directory.",
            )
        })?;
        // poppler prints its version banner on stderr.
        let banner = String::from_utf8_lossy(&output.stderr);
        let first = banner.lines().next().unwrap_or_default().trim();
        Ok(if first.is_empty() {
            exe.display().to_string()
        } else {
            first.to_string()
        })
    }

    fn render_page(
        &self,
        pdf: &Path,
        dpi: u32,
        idx: usize,
        password: Option<&str>,
        scratch: &Path,
    ) -> Result<DynamicImage, String> {
        let page_number = idx + 1;
        let prefix = scratch.join(format!("page_{page_number:04}"));
        let output = Command::new(&self.pdftoppm)
            .args(pdftoppm_args(dpi, page_number, password))
            .arg(pdf)
            .arg(&prefix)
            .output()
            .map_err(|e| format!("failed to invoke {}: {e}", self.pdftoppm.display()))?;

        if !output.status.success() {
            return Err(format!(
                "pdftoppm exited with {}: {}",
                output.status,
                stderr_line(&output)
            ));
        }

        // With -singlefile pdftoppm writes exactly `<prefix>.png`.
        let image_path = prefix.with_extension("png");
        let image = image::open(&image_path)
            .map_err(|e| format!("cannot read {}: {e}", image_path.display()))?;
        let _ = std::fs::remove_file(&image_path);
        Ok(image)
    }
}

impl Rasterizer for PopplerRasterizer {
    fn name(&self) -> &'static str {
        "poppler"
    }

    fn ensure_available(&self) -> Result<String, Pdf2CandidatesError> {
        self.probe(&self.pdfinfo)?;
        self.probe(&self.pdftoppm)
    }

    fn metadata(
        &self,
        pdf: &Path,
        password: Option<&str>,
    ) -> Result<DocumentMetadata, Pdf2CandidatesError> {
        let mut cmd = Command::new(&self.pdfinfo);
        if let Some(pwd) = password {
            cmd.arg("-upw").arg(pwd);
        }
        let output = cmd.arg(pdf).output().map_err(|e| {
            Pdf2CandidatesError::toolchain(
                self.pdfinfo.display().to_string(),
                e.to_string(),
                "Install poppler-utils or set PDF2CANDIDATES_POPPLER_DIR to its bin directory.",
            )
        })?;

        if !output.status.success() {
            return Err(open_error(pdf, password, &stderr_line(&output)));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_pdfinfo(&stdout).ok_or_else(|| Pdf2CandidatesError::MalformedInput {
            path: pdf.to_path_buf(),
            detail: "pdfinfo reported no page count".into(),
        })
    }

    fn rasterize(
        &self,
        pdf: &Path,
        dpi: u32,
        page_indices: &[usize],
        password: Option<&str>,
    ) -> RenderedPages {
        let scratch = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(e) => {
                let detail = format!("cannot create scratch directory: {e}");
                return page_indices
                    .iter()
                    .map(|&idx| (idx, Err(render_failed(idx, detail.clone()))))
                    .collect();
            }
        };

        page_indices
            .iter()
            .map(|&idx| {
                let result = self
                    .render_page(pdf, dpi, idx, password, scratch.path())
                    .map_err(|detail| render_failed(idx, detail));
                match &result {
                    Ok(img) => debug!(
                        "Rendered page {} → {}x{} px",
                        idx + 1,
                        img.width(),
                        img.height()
                    ),
                    Err(e) => warn!("{e}"),
                }
                (idx, result)
            })
            .collect()
    }
}

fn pdftoppm_args(dpi: u32, page_number: usize, password: Option<&str>) -> Vec<String> {
    let page = page_number.to_string();
    let mut args = vec![
        "-png".to_string(),
        "-r".to_string(),
        dpi.to_string(),
        "-f".to_string(),
        page.clone(),
        "-l".to_string(),
        page,
        "-singlefile".to_string(),
    ];
    if let Some(pwd) = password {
        args.push("-upw".to_string());
        args.push(pwd.to_string());
    }
    args
}

/// Parse `pdfinfo` output. `None` when there is no `Pages:` line.
fn parse_pdfinfo(stdout: &str) -> Option<DocumentMetadata> {
    let mut meta = DocumentMetadata::default();
    let mut page_count = None;

    for line in stdout.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        let text = (!value.is_empty()).then(|| value.to_string());
        match key.trim() {
            "Title" => meta.title = text,
            "Author" => meta.author = text,
            "Subject" => meta.subject = text,
            "Creator" => meta.creator = text,
            "Producer" => meta.producer = text,
            "CreationDate" => meta.creation_date = text,
            "ModDate" => meta.modification_date = text,
            "PDF version" => meta.pdf_version = value.to_string(),
            "Encrypted" => meta.is_encrypted = value.starts_with("yes"),
            "Pages" => page_count = value.parse::<usize>().ok(),
            _ => {}
        }
    }

    meta.page_count = page_count?;
    Some(meta)
}

fn stderr_line(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}

// ── Pdfium ───────────────────────────────────────────────────────────────────

/// Rasteriser backed by the pdfium library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    /// Library file or directory holding it. `None` binds the system library.
    library: Option<PathBuf>,
}

impl PdfiumRasterizer {
    pub fn new(library: Option<PathBuf>) -> Self {
        Self { library }
    }

    fn bind(&self) -> Result<Pdfium, Pdf2CandidatesError> {
        let bindings = match &self.library {
            Some(path) if path.is_dir() => {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(path))
            }
            Some(path) => Pdfium::bind_to_library(path),
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| {
            Pdf2CandidatesError::toolchain(
                "pdfium",
                format!("{e:?}"),
                "Set PDFIUM_LIB_PATH to libpdfium, or use the poppler rasterizer.",
            )
        })?;
        Ok(Pdfium::new(bindings))
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn name(&self) -> &'static str {
        "pdfium"
    }

    fn ensure_available(&self) -> Result<String, Pdf2CandidatesError> {
        self.bind()?;
        Ok(match &self.library {
            Some(path) => format!("pdfium ({})", path.display()),
            None => "pdfium (system library)".to_string(),
        })
    }

    fn metadata(
        &self,
        pdf: &Path,
        password: Option<&str>,
    ) -> Result<DocumentMetadata, Pdf2CandidatesError> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_file(pdf, password)
            .map_err(|e| open_error(pdf, password, &format!("{e:?}")))?;

        let metadata = document.metadata();
        let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
            metadata
                .get(tag)
                .map(|t| t.value().to_string())
                .filter(|v| !v.is_empty())
        };

        Ok(DocumentMetadata {
            title: get_meta(PdfDocumentMetadataTagType::Title),
            author: get_meta(PdfDocumentMetadataTagType::Author),
            subject: get_meta(PdfDocumentMetadataTagType::Subject),
            creator: get_meta(PdfDocumentMetadataTagType::Creator),
            producer: get_meta(PdfDocumentMetadataTagType::Producer),
            creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
            modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
            page_count: document.pages().len() as usize,
            pdf_version: format!("{:?}", document.version()),
            is_encrypted: password.is_some(),
        })
    }

    fn rasterize(
        &self,
        pdf: &Path,
        dpi: u32,
        page_indices: &[usize],
        password: Option<&str>,
    ) -> RenderedPages {
        let fail_all = |detail: String| -> RenderedPages {
            page_indices
                .iter()
                .map(|&idx| (idx, Err(render_failed(idx, detail.clone()))))
                .collect()
        };

        let pdfium = match self.bind() {
            Ok(p) => p,
            Err(e) => return fail_all(e.to_string()),
        };
        let document = match pdfium.load_pdf_from_file(pdf, password) {
            Ok(d) => d,
            Err(e) => return fail_all(format!("{e:?}")),
        };

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        // PDF user space is 72 units per inch.
        let render_config = PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / 72.0);

        page_indices
            .iter()
            .map(|&idx| {
                if idx >= total_pages {
                    return (
                        idx,
                        Err(render_failed(idx, format!("out of range (total={total_pages})"))),
                    );
                }
                let result = pages
                    .get(idx as u16)
                    .and_then(|page| {
                        page.render_with_config(&render_config)
                            .map(|bitmap| bitmap.as_image())
                    })
                    .map_err(|e| render_failed(idx, format!("{e:?}")));
                if let Err(e) = &result {
                    warn!("{e}");
                }
                (idx, result)
            })
            .collect()
    }
}

// ── Shared helpers ───────────────────────────────────────────────────────────

fn render_failed(idx: usize, detail: String) -> PageError {
    PageError::RenderFailed {
        page: idx + 1,
        detail,
    }
}

/// Map a document-open failure to the matching fatal error.
fn open_error(pdf: &Path, password: Option<&str>, detail: &str) -> Pdf2CandidatesError {
    let path = pdf.to_path_buf();
    if detail.to_ascii_lowercase().contains("password") {
        if password.is_some() {
            Pdf2CandidatesError::WrongPassword { path }
        } else {
            Pdf2CandidatesError::PasswordRequired { path }
        }
    } else {
        Pdf2CandidatesError::MalformedInput {
            path,
            detail: detail.to_string(),
        }
    }
}

// ── Async wrappers ───────────────────────────────────────────────────────────

/// Read metadata on the blocking pool.
pub async fn extract_metadata(
    rasterizer: Arc<dyn Rasterizer>,
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentMetadata, Pdf2CandidatesError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(str::to_string);

    tokio::task::spawn_blocking(move || rasterizer.metadata(&path, pwd.as_deref()))
        .await
        .map_err(|e| Pdf2CandidatesError::Internal(format!("Metadata task panicked: {e}")))?
}

/// Rasterise pages on the blocking pool.
pub async fn render_pages(
    rasterizer: Arc<dyn Rasterizer>,
    pdf_path: &Path,
    dpi: u32,
    page_indices: &[usize],
    password: Option<&str>,
) -> Result<RenderedPages, Pdf2CandidatesError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(str::to_string);
    let indices = page_indices.to_vec();

    info!(
        "Rasterising {} pages at {} DPI with {}",
        indices.len(),
        dpi,
        rasterizer.name()
    );
    tokio::task::spawn_blocking(move || rasterizer.rasterize(&path, dpi, &indices, pwd.as_deref()))
        .await
        .map_err(|e| Pdf2CandidatesError::Internal(format!("Render task panicked: {e}")))
}

/// Probe a rasteriser on the blocking pool.
pub async fn ensure_available(
    rasterizer: Arc<dyn Rasterizer>,
) -> Result<String, Pdf2CandidatesError> {
    tokio::task::spawn_blocking(move || rasterizer.ensure_available())
        .await
        .map_err(|e| Pdf2CandidatesError::Internal(format!("Probe task panicked: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    const PDFINFO_SAMPLE: &str = "\
Title:           Search results
Author:
Creator:         Chromium
Producer:        Skia/PDF m120
CreationDate:    Mon Mar  3 10:12:55 2025 CET
Tagged:          yes
Encrypted:       no
Pages:           4
Page size:       612 x 792 pts (letter)
PDF version:     1.4
";

    #[test]
    fn parses_pdfinfo_output() {
        let meta = parse_pdfinfo(PDFINFO_SAMPLE).unwrap();
        assert_eq!(meta.page_count, 4);
        assert_eq!(meta.title.as_deref(), Some("Search results"));
        assert_eq!(meta.author, None);
        assert_eq!(meta.producer.as_deref(), Some("Skia/PDF m120"));
        assert_eq!(meta.pdf_version, "1.4");
        assert!(!meta.is_encrypted);
        // The date keeps its own colons.
        assert_eq!(
            meta.creation_date.as_deref(),
            Some("Mon Mar  3 10:12:55 2025 CET")
        );
    }

    #[test]
    fn pdfinfo_without_pages_is_rejected() {
        assert!(parse_pdfinfo("Title: x\n").is_none());
    }

    #[test]
    fn encrypted_flag() {
        let meta = parse_pdfinfo("Encrypted: yes (print:yes copy:no)\nPages: 1\n").unwrap();
        assert!(meta.is_encrypted);
    }

    #[test]
    fn pdftoppm_renders_one_page_per_call() {
        let args = pdftoppm_args(200, 3, None);
        assert_eq!(
            args,
            ["-png", "-r", "200", "-f", "3", "-l", "3", "-singlefile"]
        );
        let args = pdftoppm_args(300, 1, Some("s3cret"));
        assert_eq!(&args[args.len() - 2..], ["-upw", "s3cret"]);
    }

    #[test]
    fn password_failures_are_classified() {
        let p = Path::new("doc.pdf");
        assert!(matches!(
            open_error(p, None, "Command Line Error: Incorrect password"),
            Pdf2CandidatesError::PasswordRequired { .. }
        ));
        assert!(matches!(
            open_error(p, Some("x"), "PdfiumLibraryInternalError(PasswordError)"),
            Pdf2CandidatesError::WrongPassword { .. }
        ));
        assert!(matches!(
            open_error(p, None, "Syntax Error: Couldn't find trailer dictionary"),
            Pdf2CandidatesError::MalformedInput { .. }
        ));
    }

    #[test]
    fn missing_poppler_is_a_toolchain_error() {
        let toolchain = Toolchain::default().with_poppler_dir("/nonexistent/poppler/bin");
        let err = PopplerRasterizer::new(&toolchain)
            .ensure_available()
            .unwrap_err();
        assert!(matches!(err, Pdf2CandidatesError::ToolchainUnavailable { .. }));
        assert!(err.to_string().contains("PDF2CANDIDATES_POPPLER_DIR"));
    }

    #[test]
    fn missing_pdfium_library_is_a_toolchain_error() {
        let r = PdfiumRasterizer::new(Some(PathBuf::from("/nonexistent/libpdfium.so")));
        let err = r.ensure_available().unwrap_err();
        assert!(err.to_string().contains("PDFIUM_LIB_PATH"));
    }
}
