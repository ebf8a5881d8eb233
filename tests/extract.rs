//! Record extraction through the public API, on OCR text shaped like the
//! listings the tool is used on.

use pdf2candidates::{
    extract, extract_text, CandidateRecord, DegreePolicy, ExtractionConfig, Grammar, GrammarConfig,
    FIELD_NAMES, NOT_AVAILABLE,
};

const TWO_PAGE_DUMP: &str = "\
--- Page 1 ---
Jane Doe - 1°
Senior Recruiter
Acme Corp - Staffing

Marco Gallo - 2°
Backend Developer Mostra tutto
Milano, Lombardia - Information Technology
Backend Developer presso Initech 2021 - oggi
--- Page 2 ---
Sara Conti - 3°
Talent Acquisition Specialist
Roma, Lazio
";

#[test]
fn canonical_example_fills_missing_company() {
    let records = extract("Jane Doe - 1°\nSenior Recruiter\nAcme Corp - Staffing\n");
    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r.name, "Jane Doe");
    assert_eq!(r.title, "Senior Recruiter");
    assert_eq!(r.company, NOT_AVAILABLE);
    assert_eq!(r.location, "Acme Corp");
    assert_eq!(r.industry, "Staffing");
}

#[test]
fn multi_page_dump_yields_records_in_order() {
    let config = ExtractionConfig::default();
    let records = extract_text(TWO_PAGE_DUMP, &config);

    let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["Jane Doe", "Marco Gallo", "Sara Conti"]);

    // Noise phrase removed from the title.
    assert_eq!(records[1].title, "Backend Developer");
    assert_eq!(records[1].company, "Initech");
    assert_eq!(records[1].industry, "Information Technology");

    assert_eq!(records[2].location, "Roma, Lazio");
    assert_eq!(records[2].industry, NOT_AVAILABLE);
    assert_eq!(records[2].company, NOT_AVAILABLE);
}

#[test]
fn every_field_is_non_empty() {
    let records = extract_text(TWO_PAGE_DUMP, &ExtractionConfig::default());
    assert!(!records.is_empty());
    for record in &records {
        for (field, value) in FIELD_NAMES.iter().zip(record.fields()) {
            assert!(!value.trim().is_empty(), "{field} is blank in {record:?}");
        }
    }
}

#[test]
fn text_without_listings_yields_no_candidates() {
    let config = ExtractionConfig::default();
    assert!(extract_text("", &config).is_empty());
    assert!(extract_text("\n\n   \n", &config).is_empty());
    assert!(extract_text("12345\n67890\n", &config).is_empty());
}

#[test]
fn extraction_is_a_pure_function_of_the_text() {
    let config = ExtractionConfig::default();
    let first = extract_text(TWO_PAGE_DUMP, &config);
    let second = extract_text(TWO_PAGE_DUMP, &config);
    assert_eq!(first, second);
}

#[test]
fn custom_noise_phrases_replace_the_default() {
    let config = ExtractionConfig::builder()
        .noise_phrases(vec!["See all".to_string()])
        .build()
        .unwrap();
    let text = "Jane Doe - 1°\nSenior Recruiter See all\nBerlin\n";
    let records = extract_text(text, &config);
    assert_eq!(records[0].title, "Senior Recruiter");
}

#[test]
fn required_degree_policy_ignores_unmarked_lines() {
    let config = ExtractionConfig::builder()
        .degree_policy(DegreePolicy::Required)
        .build()
        .unwrap();
    assert!(extract_text("Jane Doe\nSenior Recruiter\nBerlin\n", &config).is_empty());

    let optional = Grammar::new(&GrammarConfig {
        degree_policy: DegreePolicy::Optional,
        ..Default::default()
    });
    assert_eq!(
        optional.extract("Jane Doe\nSenior Recruiter\nBerlin\n"),
        vec![CandidateRecord {
            name: "Jane Doe".into(),
            title: "Senior Recruiter".into(),
            company: NOT_AVAILABLE.into(),
            location: "Berlin".into(),
            industry: NOT_AVAILABLE.into(),
        }]
    );
}

#[test]
fn records_serialise_with_field_names() {
    let records = extract("Jane Doe - 1°\nSenior Recruiter\nAcme Corp - Staffing\n");
    let value = serde_json::to_value(&records[0]).unwrap();
    for field in FIELD_NAMES {
        assert!(value.get(field).is_some(), "missing {field}");
    }
}
