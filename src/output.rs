//! Output types returned by the extraction entry points.

use crate::error::PageError;
use crate::extract::CandidateRecord;
use serde::{Deserialize, Serialize};

/// Everything one pipeline run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// Parsed candidates in document order.
    pub records: Vec<CandidateRecord>,
    /// Per-page recognition results, sorted by page number.
    pub pages: Vec<PageText>,
    pub metadata: DocumentMetadata,
    /// Cleaned text of all successful pages, joined with page markers.
    pub raw_text: String,
    pub stats: ExtractionStats,
}

impl ExtractionOutput {
    /// True when the document produced no candidates.
    ///
    /// This is a normal outcome, not an error; callers decide how to report it.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Recognised text of a single page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageText {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Cleaned text. Empty when `error` is set.
    pub text: String,
    /// Prompt tokens (vision recognizer only).
    pub input_tokens: usize,
    /// Completion tokens (vision recognizer only).
    pub output_tokens: usize,
    pub duration_ms: u64,
    pub error: Option<PageError>,
}

impl PageText {
    pub fn failed(page_num: usize, duration_ms: u64, error: PageError) -> Self {
        Self {
            page_num,
            text: String::new(),
            input_tokens: 0,
            output_tokens: 0,
            duration_ms,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Document-level facts read without recognising any page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
    pub is_encrypted: bool,
}

/// Counters and timings for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Pages in the document.
    pub total_pages: usize,
    /// Pages whose text was recognised.
    pub processed_pages: usize,
    /// Pages that failed to render or recognise.
    pub failed_pages: usize,
    /// Selected pages that never reached recognition.
    pub skipped_pages: usize,
    /// Records extracted from the concatenated text.
    pub candidates: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_duration_ms: u64,
    pub render_duration_ms: u64,
    pub recognize_duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_output_reports_no_candidates() {
        let output = ExtractionOutput {
            records: vec![],
            pages: vec![],
            metadata: DocumentMetadata::default(),
            raw_text: String::new(),
            stats: ExtractionStats::default(),
        };
        assert!(output.is_empty());
    }

    #[test]
    fn failed_page_has_no_text() {
        let page = PageText::failed(
            2,
            15,
            PageError::Timeout {
                page: 2,
                secs: 60,
            },
        );
        assert!(!page.is_ok());
        assert!(page.text.is_empty());
        assert_eq!(page.error.as_ref().map(PageError::page), Some(2));
    }

    #[test]
    fn stats_serialise_to_json() {
        let stats = ExtractionStats {
            total_pages: 3,
            processed_pages: 3,
            candidates: 7,
            ..Default::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["candidates"], 7);
        assert_eq!(json["failed_pages"], 0);
    }
}
