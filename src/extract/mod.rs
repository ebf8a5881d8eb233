//! Record extraction: turn concatenated OCR text into candidate records.
//!
//! ## Canonical grammar
//!
//! A listing block is a fixed sequence of line matchers:
//!
//! ```text
//! Jane Doe - 1°                       ← NameLine (degree marker optional)
//! Senior Recruiter                    ← TitleLine
//! Milano, Italia - Staffing           ← LocationLine (industry optional)
//! Talent Partner at Acme 2019         ← CompanyBlock (optional, ≤ N lines)
//! ```
//!
//! The scan is line-anchored. Blank lines between the name, title and
//! location lines are skipped; the company block never crosses a blank line
//! and stops early at any line that opens a new block. Lines that fit no
//! block are skipped, so the scan never forces a match and never fails.
//! Missing fields are filled with a placeholder in a single normalisation
//! pass once a block has been matched.

pub mod matchers;
pub mod record;

use matchers::{is_page_marker, CompanyBlock, LineMatcher, LocationLine, NameLine, TitleLine};
use record::RecordFields;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use record::{CandidateRecord, FIELD_NAMES, NOT_AVAILABLE};

/// Whether a name line must carry a connection-degree marker ("- 1°").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DegreePolicy {
    /// Markers are optional.
    Optional,
    /// Only marked name lines open a block.
    Required,
    /// `Required` when at least one line of the text carries a marker,
    /// otherwise `Optional`. (default)
    #[default]
    Auto,
}

/// Tunables for the record grammar and the text cleanup that precedes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrammarConfig {
    pub degree_policy: DegreePolicy,
    /// Maximum lines after the location line scanned for a company. Default: 3.
    pub company_block_max_lines: usize,
    /// Value for fields the grammar did not recover. Default: "Not Available".
    pub placeholder: String,
    /// Phrases deleted from OCR text before matching. Default: ["Mostra tutto"].
    pub noise_phrases: Vec<String>,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        Self {
            degree_policy: DegreePolicy::default(),
            company_block_max_lines: 3,
            placeholder: NOT_AVAILABLE.to_string(),
            noise_phrases: vec!["Mostra tutto".to_string()],
        }
    }
}

/// The composed line grammar.
#[derive(Debug, Clone)]
pub struct Grammar {
    name: NameLine,
    title: TitleLine,
    location: LocationLine,
    company: CompanyBlock,
    degree_policy: DegreePolicy,
    placeholder: String,
}

impl Default for Grammar {
    fn default() -> Self {
        Self::new(&GrammarConfig::default())
    }
}

impl Grammar {
    pub fn new(config: &GrammarConfig) -> Self {
        Self {
            name: NameLine,
            title: TitleLine,
            location: LocationLine,
            company: CompanyBlock {
                max_lines: config.company_block_max_lines,
            },
            degree_policy: config.degree_policy,
            placeholder: config.placeholder.clone(),
        }
    }

    /// Extract every record from `raw_text`, in input order.
    ///
    /// Page markers are dropped before matching. The result is a pure
    /// function of the input; an empty vector means no candidates were found.
    pub fn extract(&self, raw_text: &str) -> Vec<CandidateRecord> {
        let lines: Vec<&str> = raw_text
            .lines()
            .map(str::trim)
            .filter(|line| !is_page_marker(line))
            .collect();

        let require_degree = match self.degree_policy {
            DegreePolicy::Optional => false,
            DegreePolicy::Required => true,
            DegreePolicy::Auto => lines.iter().any(|line| self.name.is_marked(line)),
        };
        debug!(
            "Scanning {} lines (degree marker required: {})",
            lines.len(),
            require_degree
        );

        let scan = Scan {
            grammar: self,
            lines: &lines,
            require_degree,
        };

        let mut records = Vec::new();
        let mut i = 0;
        while i < lines.len() {
            let Some((mut fields, after_location)) = scan.block_at(i) else {
                i += 1;
                continue;
            };
            let (company, next) = scan.company_after(after_location);
            RecordFields::set(&mut fields.company, company.as_deref());
            records.push(fields.normalize(&self.placeholder));
            i = next;
        }

        debug!("Matched {} candidate blocks", records.len());
        records
    }
}

/// Extract records with the default grammar.
pub fn extract(raw_text: &str) -> Vec<CandidateRecord> {
    Grammar::default().extract(raw_text)
}

/// One pass over a fixed set of lines.
struct Scan<'a> {
    grammar: &'a Grammar,
    lines: &'a [&'a str],
    require_degree: bool,
}

impl Scan<'_> {
    fn next_non_blank(&self, from: usize) -> Option<usize> {
        (from..self.lines.len()).find(|&i| !self.lines[i].is_empty())
    }

    /// Name, title and location starting at line `i`, plus the index of the
    /// line after the location.
    fn block_at(&self, i: usize) -> Option<(RecordFields, usize)> {
        let g = self.grammar;

        let name = g.name.capture(self.lines[i])?;
        if self.require_degree && name.degree.is_none() {
            return None;
        }

        let t = self.next_non_blank(i + 1)?;
        if g.name.is_marked(self.lines[t]) {
            return None;
        }
        let title = g.title.capture(self.lines[t])?;

        let l = self.next_non_blank(t + 1)?;
        if g.name.is_marked(self.lines[l]) {
            return None;
        }
        let location = g.location.capture(self.lines[l])?;

        let mut fields = RecordFields::default();
        RecordFields::set(&mut fields.name, Some(&name.name));
        RecordFields::set(&mut fields.title, Some(&title));
        RecordFields::set(&mut fields.location, Some(&location.location));
        RecordFields::set(&mut fields.industry, location.industry.as_deref());
        Some((fields, l + 1))
    }

    /// Company block beginning at `start`, and where the scan resumes.
    fn company_after(&self, start: usize) -> (Option<String>, usize) {
        let max = self.grammar.company.max_lines;
        let mut block = Vec::new();
        let mut i = start;
        while i < self.lines.len()
            && block.len() < max
            && !self.lines[i].is_empty()
            && self.block_at(i).is_none()
        {
            block.push(self.lines[i]);
            i += 1;
        }
        (self.grammar.company.capture(&block), i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grammar(policy: DegreePolicy) -> Grammar {
        Grammar::new(&GrammarConfig {
            degree_policy: policy,
            ..Default::default()
        })
    }

    #[test]
    fn canonical_three_line_block() {
        let records = extract("Jane Doe - 1°\nSenior Recruiter\nAcme Corp - Staffing\n");
        assert_eq!(
            records,
            vec![CandidateRecord {
                name: "Jane Doe".into(),
                title: "Senior Recruiter".into(),
                company: NOT_AVAILABLE.into(),
                location: "Acme Corp".into(),
                industry: "Staffing".into(),
            }]
        );
    }

    #[test]
    fn noisy_location_line_keeps_the_record() {
        let records = extract("Jane Doe - 1°\nSenior Recruiter\nMilano - Servizi IT (B2B)\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].location, "Milano");
        assert_eq!(records[0].industry, "Servizi IT (B2B)");

        let records = extract("Jane Doe - 1°\nSenior Recruiter\nRoma (RM)\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].location, "Roma");
        assert_eq!(records[0].industry, NOT_AVAILABLE);
    }

    #[test]
    fn company_keeps_its_final_period() {
        let records = extract("Jane Doe - 1°\nSenior Recruiter\nMilano\nRecruiter at Acme Inc.\n");
        assert_eq!(records[0].company, "Acme Inc.");
    }

    #[test]
    fn no_name_line_yields_nothing() {
        let text = "lorem ipsum dolor\n123 456\n\nsit amet";
        assert!(extract(text).is_empty());
        assert!(extract("").is_empty());
    }

    #[test]
    fn company_line_follows_location() {
        let text = "Luca Bianchi · 2nd\nData Engineer\nTorino, Piemonte\nData Engineer presso Fiat 2020 - oggi\n";
        let records = extract(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].company, "Fiat");
        assert_eq!(records[0].industry, NOT_AVAILABLE);
    }

    #[test]
    fn company_block_stops_at_next_marked_name() {
        let text = "\
Anna Verdi - 2°
HR Business Partner
Roma - Risorse umane
Initech
Paolo Neri - 3°
Recruiter
Napoli
";
        let records = extract(text);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].company, "Initech");
        assert_eq!(records[1].name, "Paolo Neri");
        assert_eq!(records[1].company, NOT_AVAILABLE);
        assert_eq!(records[1].location, "Napoli");
    }

    #[test]
    fn page_marker_inside_a_block_is_ignored() {
        let text = "Jane Doe - 1°\nSenior Recruiter\n--- Page 2 ---\nBerlin - Staffing\n";
        let records = extract(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].location, "Berlin");
    }

    #[test]
    fn auto_policy_requires_markers_when_present() {
        // "Head Of Sales" would parse as an unmarked name; with markers in the
        // text it must not open a block.
        let text = "\
Jane Doe - 1°
Senior Recruiter
Milano

Head Of Sales
Manager
Roma
";
        assert_eq!(grammar(DegreePolicy::Auto).extract(text).len(), 1);
        assert_eq!(grammar(DegreePolicy::Optional).extract(text).len(), 2);
    }

    #[test]
    fn required_policy_skips_unmarked_text() {
        let text = "Jane Doe\nSenior Recruiter\nMilano\n";
        assert!(grammar(DegreePolicy::Required).extract(text).is_empty());
        assert_eq!(grammar(DegreePolicy::Optional).extract(text).len(), 1);
    }

    #[test]
    fn unmarked_blocks_separated_by_blank_lines() {
        let text = "\
Mario Rossi
Software Engineer
Bologna - Software

Giulia Russo
Product Manager
Firenze
Globex
";
        let records = extract(text);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].company, NOT_AVAILABLE);
        assert_eq!(records[1].company, "Globex");
    }

    #[test]
    fn incomplete_block_is_skipped() {
        // Location line with digits breaks the first block; the second block
        // still matches.
        let text = "\
Jane Doe - 1°
Recruiter
20121 Milano
John Roe - 2°
Sourcer
Paris
";
        let records = extract(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "John Roe");
    }

    #[test]
    fn extraction_is_idempotent_and_ordered() {
        let text = "A Uno - 1°\nT1\nRoma\nB Due - 2°\nT2\nMilano\nC Tre - 3°\nT3\nTorino\n";
        let first = extract(text);
        let second = extract(text);
        assert_eq!(first, second);
        let names: Vec<_> = first.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["A Uno", "B Due", "C Tre"]);
    }

    #[test]
    fn duplicates_are_kept() {
        let block = "Jane Doe - 1°\nSenior Recruiter\nMilano\n";
        let records = extract(&format!("{block}{block}"));
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], records[1]);
    }

    #[test]
    fn custom_placeholder_and_block_size() {
        let g = Grammar::new(&GrammarConfig {
            placeholder: "N/A".into(),
            company_block_max_lines: 1,
            ..Default::default()
        });
        let text = "Jane Doe - 1°\nRecruiter\nMilano\nSkilled in sourcing\nRecruiter at Acme\n";
        let records = g.extract(text);
        assert_eq!(records.len(), 1);
        // Only the first line after the location is considered.
        assert_eq!(records[0].company, "Skilled in sourcing");
        assert_eq!(records[0].industry, "N/A");
    }
}
