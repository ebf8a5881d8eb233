//! Candidate records and the placeholder normalisation step.

use serde::{Deserialize, Serialize};

/// Value written into every field the grammar could not recover.
pub const NOT_AVAILABLE: &str = "Not Available";

/// Column names in their fixed presentation order.
pub const FIELD_NAMES: [&str; 5] = ["name", "title", "company", "location", "industry"];

/// One parsed candidate. All five fields are always populated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub name: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub industry: String,
}

impl CandidateRecord {
    /// Field values in [`FIELD_NAMES`] order.
    pub fn fields(&self) -> [&str; 5] {
        [
            &self.name,
            &self.title,
            &self.company,
            &self.location,
            &self.industry,
        ]
    }
}

/// Raw matcher output before normalisation.
///
/// `None` means the matcher for that field did not capture anything. Empty or
/// whitespace-only captures are folded into `None` by [`RecordFields::set`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFields {
    pub name: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub industry: Option<String>,
}

impl RecordFields {
    /// Trim `value` and keep it only when something is left.
    pub fn set(slot: &mut Option<String>, value: Option<&str>) {
        *slot = value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
    }

    /// Fill every absent field with `placeholder`.
    pub fn normalize(self, placeholder: &str) -> CandidateRecord {
        let fill = |v: Option<String>| v.unwrap_or_else(|| placeholder.to_string());
        CandidateRecord {
            name: fill(self.name),
            title: fill(self.title),
            company: fill(self.company),
            location: fill(self.location),
            industry: fill(self.industry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_fills_every_missing_field() {
        let record = RecordFields {
            name: Some("Jane Doe".into()),
            ..Default::default()
        }
        .normalize(NOT_AVAILABLE);

        assert_eq!(record.name, "Jane Doe");
        for value in &record.fields()[1..] {
            assert_eq!(*value, NOT_AVAILABLE);
        }
    }

    #[test]
    fn set_folds_blank_captures_into_none() {
        let mut slot = Some("stale".to_string());
        RecordFields::set(&mut slot, Some("   "));
        assert_eq!(slot, None);

        RecordFields::set(&mut slot, Some("  Staffing "));
        assert_eq!(slot.as_deref(), Some("Staffing"));
    }

    #[test]
    fn fields_follow_column_order() {
        let record = CandidateRecord {
            name: "n".into(),
            title: "t".into(),
            company: "c".into(),
            location: "l".into(),
            industry: "i".into(),
        };
        assert_eq!(record.fields(), ["n", "t", "c", "l", "i"]);
    }
}
