//! Transcription prompts for the vision recognizer.
//!
//! The vision backend stands in for tesseract, so the prompts ask for a
//! plain transcription, not an interpretation: the record grammar downstream
//! expects the same line shapes tesseract would produce.

use crate::config::PageSegmentationMode;

/// Shared rules for every transcription prompt.
pub const TRANSCRIPTION_RULES: &str = r#"You are an OCR engine. Transcribe the text visible in the page image.

Rules:
1. Output ONLY the transcribed text, as plain UTF-8.
2. Keep one visual line per output line, in reading order.
3. Copy names, job titles, companies and places exactly as printed, including accents.
4. Keep connection-degree markers such as "1°", "2nd" or "3rd" on the line where they appear.
5. Do NOT use Markdown, bullet points, code fences or commentary.
6. Do NOT invent text that is not visible. Skip icons, photos and buttons."#;

/// Extra instruction for block-oriented modes.
pub const SINGLE_BLOCK_SUFFIX: &str = r#"
7. Treat the page as one block: do not insert blank lines inside a listing, only between listings."#;

/// Extra instruction for layout-driven modes.
pub const LAYOUT_SUFFIX: &str = r#"
7. Follow the page layout: read columns top to bottom, left column first, and separate distinct regions with a blank line."#;

/// System prompt matching a page segmentation mode.
pub fn system_prompt(psm: PageSegmentationMode) -> String {
    let suffix = if psm.is_single_block() {
        SINGLE_BLOCK_SUFFIX
    } else {
        LAYOUT_SUFFIX
    };
    format!("{TRANSCRIPTION_RULES}{suffix}")
}

/// User turn accompanying the page image.
pub fn user_prompt(language: Option<&str>) -> String {
    match language {
        Some(lang) if !lang.trim().is_empty() => {
            format!("Transcribe this page. Expected language(s): {lang}.")
        }
        _ => "Transcribe this page.".to_string(),
    }
}
