//! Input resolution: turn a path or an uploaded buffer into a local PDF file.
//!
//! Both rasterisers need a file-system path (`pdftoppm` is a subprocess,
//! pdfium opens by path), so in-memory uploads are spilled to a
//! [`NamedTempFile`] that lives as long as the [`ResolvedInput`]. The `%PDF`
//! magic is checked up front so a non-PDF upload is reported as
//! [`Pdf2CandidatesError::MalformedInput`] instead of a rasteriser failure.

use crate::error::Pdf2CandidatesError;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A PDF ready to be rasterised.
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input arrived as bytes; kept in a temp file until dropped.
    Buffered { path: PathBuf, _file: NamedTempFile },
}

impl ResolvedInput {
    /// Path to the PDF regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Buffered { path, .. } => path,
        }
    }
}

/// Validate a local PDF path: it must exist, be readable and start with `%PDF`.
pub fn resolve_local(path: impl AsRef<Path>) -> Result<ResolvedInput, Pdf2CandidatesError> {
    let path = path.as_ref().to_path_buf();

    if !path.is_file() {
        return Err(Pdf2CandidatesError::FileNotFound { path });
    }

    let mut file = match std::fs::File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Pdf2CandidatesError::PermissionDenied { path });
        }
        Err(_) => return Err(Pdf2CandidatesError::FileNotFound { path }),
    };

    let mut head = Vec::with_capacity(PDF_MAGIC.len());
    Read::by_ref(&mut file)
        .take(PDF_MAGIC.len() as u64)
        .read_to_end(&mut head)
        .map_err(|e| Pdf2CandidatesError::MalformedInput {
            path: path.clone(),
            detail: e.to_string(),
        })?;
    check_magic(&path, &head)?;

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

/// Spill an uploaded PDF to a temp file.
pub fn resolve_bytes(bytes: &[u8]) -> Result<ResolvedInput, Pdf2CandidatesError> {
    check_magic(Path::new("<upload>"), bytes)?;

    let mut file = tempfile::Builder::new()
        .prefix("pdf2candidates-")
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| Pdf2CandidatesError::Internal(format!("tempfile: {e}")))?;
    file.write_all(bytes)
        .and_then(|_| file.flush())
        .map_err(|e| Pdf2CandidatesError::Internal(format!("tempfile write: {e}")))?;

    let path = file.path().to_path_buf();
    debug!("Buffered {} byte upload at {}", bytes.len(), path.display());
    Ok(ResolvedInput::Buffered { path, _file: file })
}

fn check_magic(path: &Path, head: &[u8]) -> Result<(), Pdf2CandidatesError> {
    if head.starts_with(PDF_MAGIC) {
        return Ok(());
    }
    let shown = &head[..head.len().min(PDF_MAGIC.len())];
    Err(Pdf2CandidatesError::MalformedInput {
        path: path.to_path_buf(),
        detail: format!("expected %PDF header, first bytes are {shown:?}"),
    })
}
