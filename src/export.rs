//! Presentation and export of candidate records.
//!
//! * [`render_table`]: fixed-width text table for terminals.
//! * [`to_xlsx_bytes`] / [`write_xlsx`]: single-sheet spreadsheet.
//! * [`to_json`]: records as a JSON array.
//!
//! Every format uses the column order of [`FIELD_NAMES`].

use crate::error::Pdf2CandidatesError;
use crate::extract::{CandidateRecord, FIELD_NAMES};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::path::Path;
use tracing::debug;

/// Default file name of the exported spreadsheet.
pub const XLSX_FILE_NAME: &str = "candidates.xlsx";

/// MIME type of the exported spreadsheet.
pub const XLSX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Name of the single worksheet.
pub const SHEET_NAME: &str = "Candidates";

/// Widest a table column gets before values are cut with an ellipsis.
const MAX_COLUMN_WIDTH: usize = 40;

// ── Text table ───────────────────────────────────────────────────────────────

/// Render records as a fixed-width table with a header row.
///
/// An empty slice renders the header and rule only.
pub fn render_table(records: &[CandidateRecord]) -> String {
    let mut widths = FIELD_NAMES.map(|h| h.chars().count());
    for record in records {
        for (w, value) in widths.iter_mut().zip(record.fields()) {
            *w = (*w).max(value.chars().count()).min(MAX_COLUMN_WIDTH);
        }
    }

    let mut out = String::new();
    push_row(&mut out, &FIELD_NAMES, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&rule.join("-+-"));
    out.push('\n');
    for record in records {
        push_row(&mut out, &record.fields(), &widths);
    }
    out
}

fn push_row(out: &mut String, cells: &[&str; 5], widths: &[usize; 5]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, &w)| format!("{:<w$}", fit(cell, w)))
        .collect();
    out.push_str(padded.join(" | ").trim_end());
    out.push('\n');
}

fn fit(cell: &str, width: usize) -> String {
    if cell.chars().count() <= width {
        return cell.to_string();
    }
    let mut cut: String = cell.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

// ── Spreadsheet ──────────────────────────────────────────────────────────────

/// Build the spreadsheet in memory.
///
/// One sheet, a bold header row with the five column names, then one row per
/// record in input order. An empty slice yields a header-only workbook.
pub fn to_xlsx_bytes(records: &[CandidateRecord]) -> Result<Vec<u8>, Pdf2CandidatesError> {
    build_workbook(records).map_err(|e| Pdf2CandidatesError::ExportFailed(e.to_string()))
}

fn build_workbook(records: &[CandidateRecord]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;
    sheet.set_freeze_panes(1, 0)?;

    for (col, name) in FIELD_NAMES.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, &header)?;
    }

    let mut widths = FIELD_NAMES.map(|h| h.chars().count());
    for (i, record) in records.iter().enumerate() {
        let row = (i + 1) as u32;
        for (col, value) in record.fields().iter().enumerate() {
            sheet.write_string(row, col as u16, *value)?;
            widths[col] = widths[col].max(value.chars().count());
        }
    }
    for (col, w) in widths.iter().enumerate() {
        sheet.set_column_width(col as u16, (*w).min(60) as f64 + 2.0)?;
    }

    let bytes = workbook.save_to_buffer()?;
    debug!("Built {} byte workbook with {} rows", bytes.len(), records.len());
    Ok(bytes)
}

/// Write the spreadsheet to `path`.
///
/// The bytes go to a sibling temp file that is renamed into place, so a
/// reader never sees a partial workbook.
pub async fn write_xlsx(
    records: &[CandidateRecord],
    path: impl AsRef<Path>,
) -> Result<(), Pdf2CandidatesError> {
    let path = path.as_ref();
    let bytes = to_xlsx_bytes(records)?;
    let write_failed = |source: std::io::Error| Pdf2CandidatesError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
    }

    let tmp_path = path.with_extension("xlsx.tmp");
    tokio::fs::write(&tmp_path, &bytes).await.map_err(write_failed)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_failed)?;
    Ok(())
}

// ── JSON ─────────────────────────────────────────────────────────────────────

/// Records as a pretty-printed JSON array.
pub fn to_json(records: &[CandidateRecord]) -> Result<String, Pdf2CandidatesError> {
    serde_json::to_string_pretty(records)
        .map_err(|e| Pdf2CandidatesError::ExportFailed(format!("JSON: {e}")))
}
