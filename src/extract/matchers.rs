//! Field matchers: one per layout assumption.
//!
//! Each matcher recognises exactly one piece of a listing block and knows
//! nothing about its neighbours. [`super::Grammar`] composes them in a fixed
//! order. When the source layout drifts, the matcher for the affected field
//! is the only thing that changes.

use once_cell::sync::Lazy;
use regex::Regex;

/// A matcher that inspects a single, already trimmed, line.
pub trait LineMatcher {
    type Capture;

    /// Return the capture when `line` has the shape this matcher expects.
    fn capture(&self, line: &str) -> Option<Self::Capture>;

    fn matches(&self, line: &str) -> bool {
        self.capture(line).is_some()
    }
}

// ── Name line ────────────────────────────────────────────────────────────────

// Two to five capitalised tokens, then an optional connection-degree marker
// such as "- 1°", "· 2nd", "3rd" or "3°+".
static RE_NAME_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<name>\p{Lu}[\p{L}'’.\-]*(?:[ \t]+\p{Lu}[\p{L}'’.\-]*){1,4})(?:[ \t]*[-–—·•|,]?[ \t]*(?P<degree>[1-3])[ \t]*(?:°|º|st|nd|rd|th)?\+?)?[ \t]*$",
    )
    .unwrap()
});

/// What a name line yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameCapture {
    pub name: String,
    /// Connection degree when the line carries a marker.
    pub degree: Option<u8>,
}

/// Recognises the line that opens a listing block.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameLine;

impl NameLine {
    /// True for name lines that carry a connection-degree marker.
    ///
    /// A marked line is never accepted as a title, location or company line.
    pub fn is_marked(&self, line: &str) -> bool {
        self.capture(line).is_some_and(|c| c.degree.is_some())
    }
}

impl LineMatcher for NameLine {
    type Capture = NameCapture;

    fn capture(&self, line: &str) -> Option<NameCapture> {
        let caps = RE_NAME_LINE.captures(line)?;
        let name = caps.name("name")?.as_str().trim().to_string();
        let degree = caps
            .name("degree")
            .and_then(|d| d.as_str().parse::<u8>().ok());
        Some(NameCapture { name, degree })
    }
}

// ── Title line ───────────────────────────────────────────────────────────────

/// Free-form single-line headline. Any non-blank line qualifies.
#[derive(Debug, Clone, Copy, Default)]
pub struct TitleLine;

impl LineMatcher for TitleLine {
    type Capture = String;

    fn capture(&self, line: &str) -> Option<String> {
        let title = line.trim();
        (!title.is_empty()).then(|| title.to_string())
    }
}

// ── Location / industry line ─────────────────────────────────────────────────

// The industry follows the first whitespace-led hyphen or dash.
// "Emilia-Romagna" has no leading whitespace before its hyphen and stays a
// location.
static RE_INDUSTRY_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]+[-–—][ \t]*").unwrap());

// Leading run of Latin letters (accented included). Whatever follows it
// before the separator ("(RM)", a postcode) is OCR residue and is dropped.
static RE_LOCATION_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-zÀ-ÖØ-öø-ÿ][A-Za-zÀ-ÖØ-öø-ÿ \t'’.,\-]*").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationCapture {
    pub location: String,
    pub industry: Option<String>,
}

/// Recognises the "location - industry" line.
///
/// Only the location prefix is required. The industry is the free text after
/// the separator, kept when it starts with a letter.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocationLine;

impl LineMatcher for LocationLine {
    type Capture = LocationCapture;

    fn capture(&self, line: &str) -> Option<LocationCapture> {
        let line = line.trim();
        let (head, tail) = match RE_INDUSTRY_SEPARATOR.find(line) {
            Some(sep) => (&line[..sep.start()], Some(&line[sep.end()..])),
            None => (line, None),
        };

        let location = trim_punctuation(RE_LOCATION_PREFIX.find(head)?.as_str());
        if location.is_empty() {
            return None;
        }
        let industry = tail
            .map(trim_punctuation)
            .filter(|s| s.chars().next().is_some_and(char::is_alphabetic));
        Some(LocationCapture { location, industry })
    }
}

// ── Company block ────────────────────────────────────────────────────────────

// A preposition, then the company, ending at a four-digit year or end of line:
// "Talent Partner at Acme Corp 2019 - present" → "Acme Corp".
static RE_COMPANY_PREPOSITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?im)(?:^|[ \t])(?:at|for|presso)[ \t]+(?P<company>[^\n]+?)[ \t]*(?:[-–—,(·|][ \t]*)?(?:\b\d{4}\b|$)",
    )
    .unwrap()
});

static RE_EXPERIENCE_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:current|past|attuale|precedente)[ \t]*:[ \t]*").unwrap()
});

/// Recovers a company name from the optional lines after the location.
#[derive(Debug, Clone, Copy)]
pub struct CompanyBlock {
    /// Upper bound on lines consumed as the company block.
    pub max_lines: usize,
}

impl Default for CompanyBlock {
    fn default() -> Self {
        Self { max_lines: 3 }
    }
}

impl CompanyBlock {
    /// Company from the block lines, if any.
    ///
    /// The preposition pattern wins over everything else; a lone line with no
    /// preposition is taken verbatim (minus a "Current:"-style label).
    pub fn capture(&self, block: &[&str]) -> Option<String> {
        if block.is_empty() {
            return None;
        }
        let text = block.join("\n");
        if let Some(company) = RE_COMPANY_PREPOSITION
            .captures(&text)
            .and_then(|caps| caps.name("company"))
            .map(|m| trim_punctuation(m.as_str()))
            .filter(|s| !s.is_empty())
        {
            return Some(company);
        }
        if let [line] = block {
            let direct = trim_punctuation(&RE_EXPERIENCE_LABEL.replace(line.trim(), ""));
            return (!direct.is_empty()).then_some(direct);
        }
        None
    }
}

// ── Page markers ─────────────────────────────────────────────────────────────

static RE_PAGE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^-{2,}[ \t]*page[ \t]+\d+[ \t]*-{2,}$").unwrap());

/// True for the `--- Page N ---` lines inserted between pages.
pub fn is_page_marker(line: &str) -> bool {
    RE_PAGE_MARKER.is_match(line.trim())
}

fn trim_punctuation(s: &str) -> String {
    s.trim()
        .trim_end_matches(|c: char| c.is_whitespace() || ",;:-–—·|(".contains(c))
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_line_with_degree_marker() {
        let cap = NameLine.capture("Jane Doe - 1°").unwrap();
        assert_eq!(cap.name, "Jane Doe");
        assert_eq!(cap.degree, Some(1));
    }

    #[test]
    fn name_line_marker_variants() {
        for (line, degree) in [
            ("Marco Rossi · 2nd", 2),
            ("Marco Rossi 3rd", 3),
            ("Marco Rossi • 3°+", 3),
            ("Marco Rossi 1º", 1),
        ] {
            let cap = NameLine.capture(line).unwrap_or_else(|| panic!("{line}"));
            assert_eq!(cap.name, "Marco Rossi", "{line}");
            assert_eq!(cap.degree, Some(degree), "{line}");
        }
    }

    #[test]
    fn name_line_without_marker() {
        let cap = NameLine.capture("Élodie Van Der Berg").unwrap();
        assert_eq!(cap.name, "Élodie Van Der Berg");
        assert_eq!(cap.degree, None);
        assert!(!NameLine.is_marked("Élodie Van Der Berg"));
    }

    #[test]
    fn name_line_rejects_non_names() {
        assert!(!NameLine.matches("Jane"));
        assert!(!NameLine.matches("jane doe"));
        assert!(!NameLine.matches("Senior recruiter at Acme"));
        assert!(!NameLine.matches("Acme Corp - Staffing"));
        assert!(!NameLine.matches("One Two Three Four Five Six"));
    }

    #[test]
    fn title_line_takes_any_non_blank_line() {
        assert_eq!(
            TitleLine.capture("  Senior Recruiter | HR  ").as_deref(),
            Some("Senior Recruiter | HR")
        );
        assert_eq!(TitleLine.capture("   "), None);
    }

    #[test]
    fn location_with_industry() {
        let cap = LocationLine.capture("Acme Corp - Staffing").unwrap();
        assert_eq!(cap.location, "Acme Corp");
        assert_eq!(cap.industry.as_deref(), Some("Staffing"));
    }

    #[test]
    fn location_with_accents_and_commas() {
        let cap = LocationLine
            .capture("Forlì, Emilia-Romagna, Italia – Servizi finanziari")
            .unwrap();
        assert_eq!(cap.location, "Forlì, Emilia-Romagna, Italia");
        assert_eq!(cap.industry.as_deref(), Some("Servizi finanziari"));
    }

    #[test]
    fn location_without_industry() {
        let cap = LocationLine.capture("München").unwrap();
        assert_eq!(cap.location, "München");
        assert_eq!(cap.industry, None);
    }

    #[test]
    fn location_keeps_prefix_before_ocr_residue() {
        let cap = LocationLine.capture("Roma (RM)").unwrap();
        assert_eq!(cap.location, "Roma");
        assert_eq!(cap.industry, None);

        let cap = LocationLine.capture("Milano - Servizi IT (B2B)").unwrap();
        assert_eq!(cap.location, "Milano");
        assert_eq!(cap.industry.as_deref(), Some("Servizi IT (B2B)"));
    }

    #[test]
    fn industry_without_a_leading_letter_is_absent() {
        let cap = LocationLine.capture("Torino - 500+").unwrap();
        assert_eq!(cap.location, "Torino");
        assert_eq!(cap.industry, None);

        let cap = LocationLine.capture("Torino -").unwrap();
        assert_eq!(cap.location, "Torino");
        assert_eq!(cap.industry, None);
    }

    #[test]
    fn trailing_abbreviation_dots_are_kept() {
        assert_eq!(
            CompanyBlock::default().capture(&["Recruiter at Acme Inc."]).as_deref(),
            Some("Acme Inc.")
        );
        let cap = LocationLine.capture("St. Gallen - Financial Svcs.").unwrap();
        assert_eq!(cap.location, "St. Gallen");
        assert_eq!(cap.industry.as_deref(), Some("Financial Svcs."));
    }

    #[test]
    fn location_rejects_digits() {
        assert!(!LocationLine.matches("20121 Milano"));
        assert!(!LocationLine.matches("500+ connections"));
    }

    #[test]
    fn company_from_preposition_stops_at_year() {
        let block = ["Talent Partner at Acme Corp 2019 - present"];
        assert_eq!(
            CompanyBlock::default().capture(&block).as_deref(),
            Some("Acme Corp")
        );
    }

    #[test]
    fn company_from_italian_preposition_across_lines() {
        let block = ["Attuale: Recruiter", "presso Rossi & Figli S.p.A."];
        assert_eq!(
            CompanyBlock::default().capture(&block).as_deref(),
            Some("Rossi & Figli S.p.A.")
        );
    }

    #[test]
    fn company_from_single_direct_line() {
        assert_eq!(
            CompanyBlock::default().capture(&["Current: Globex"]).as_deref(),
            Some("Globex")
        );
        assert_eq!(
            CompanyBlock::default().capture(&["Initech"]).as_deref(),
            Some("Initech")
        );
    }

    #[test]
    fn company_absent_for_multi_line_block_without_preposition() {
        let block = ["Skilled in sourcing", "Open to work"];
        assert_eq!(CompanyBlock::default().capture(&block), None);
        assert_eq!(CompanyBlock::default().capture(&[]), None);
    }

    #[test]
    fn preposition_needs_a_word_boundary() {
        // "Attuale" and "format" must not be read as "at".
        let block = ["Attuale informatore"];
        assert_eq!(
            CompanyBlock::default().capture(&block).as_deref(),
            Some("Attuale informatore")
        );
    }

    #[test]
    fn page_markers() {
        assert!(is_page_marker("--- Page 3 ---"));
        assert!(is_page_marker("  -- page 12 --  "));
        assert!(!is_page_marker("Page 3"));
        assert!(!is_page_marker("--- Jane Doe ---"));
    }
}
