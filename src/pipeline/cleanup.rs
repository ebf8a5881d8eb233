//! Deterministic cleanup of recognised page text.
//!
//! OCR output carries artefacts that confuse the line grammar: CRLF line
//! endings, zero-width characters, trailing spaces, UI labels captured from
//! the screenshot ("Mostra tutto"), and long runs of blank lines. Each rule
//! below is a pure `&str → String` pass.
//!
//! ## Rule order
//!
//! Line endings are normalised first so every later rule can split on `\n`.
//! Noise phrases are removed before trailing whitespace is trimmed so a line
//! that contained only the phrase becomes blank, and blank runs are collapsed
//! last.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to one page of recognised text.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 3. Remove configured noise phrases
/// 4. Trim trailing whitespace per line
/// 5. Collapse 3+ consecutive blank lines down to one blank line
/// 6. Trim leading/trailing blank lines of the page
pub fn clean_page_text(input: &str, noise_phrases: &[String]) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = remove_noise_phrases(&s, noise_phrases);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim_matches('\n').to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{000C}',
        ],
        "",
    )
}

// ── Rule 3: Remove noise phrases ─────────────────────────────────────────────

fn remove_noise_phrases(input: &str, phrases: &[String]) -> String {
    phrases
        .iter()
        .filter(|p| !p.is_empty())
        .fold(input.to_string(), |acc, phrase| acc.replace(phrase.as_str(), ""))
}

// ── Rule 4: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 5: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn noise() -> Vec<String> {
        vec!["Mostra tutto".to_string()]
    }

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_remove_invisible() {
        let input = "Jane\u{200B} Doe\u{FEFF}\u{000C}";
        assert_eq!(remove_invisible_chars(input), "Jane Doe");
    }

    #[test]
    fn test_remove_noise_phrases() {
        let input = "Esperienza\nMostra tutto\nAcme";
        assert_eq!(remove_noise_phrases(input, &noise()), "Esperienza\n\nAcme");
    }

    #[test]
    fn test_empty_noise_phrase_is_ignored() {
        assert_eq!(remove_noise_phrases("abc", &[String::new()]), "abc");
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_clean_page_text_full_pipeline() {
        let input = "\r\n\r\nJane Doe - 1°   \r\nSenior Recruiter Mostra tutto\r\n\r\n\r\n\r\nMilano\u{200B}\n\n";
        let cleaned = clean_page_text(input, &noise());
        assert_eq!(cleaned, "Jane Doe - 1°\nSenior Recruiter\n\nMilano");
    }
}
