//! Spreadsheet export, read back with calamine.

use calamine::{Reader, Xlsx};
use pdf2candidates::export::SHEET_NAME;
use pdf2candidates::{extract, to_xlsx_bytes, write_xlsx, CandidateRecord, FIELD_NAMES};
use std::io::Cursor;

fn read_rows(bytes: Vec<u8>) -> Vec<Vec<String>> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).expect("valid xlsx");
    assert_eq!(workbook.sheet_names(), vec![SHEET_NAME.to_string()]);
    let range = workbook.worksheet_range(SHEET_NAME).expect("sheet exists");
    range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect()
}

fn sample_records() -> Vec<CandidateRecord> {
    extract(
        "\
Jane Doe - 1°
Senior Recruiter
Acme Corp - Staffing
Recruiter at Globex 2018 - present

John Roe - 2°
Sourcer
Paris
",
    )
}

#[test]
fn workbook_has_header_then_one_row_per_record() {
    let records = sample_records();
    assert_eq!(records.len(), 2);

    let rows = read_rows(to_xlsx_bytes(&records).unwrap());
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0], FIELD_NAMES.map(String::from).to_vec());
    assert_eq!(
        rows[1],
        ["Jane Doe", "Senior Recruiter", "Globex", "Acme Corp", "Staffing"]
    );
    assert_eq!(
        rows[2],
        ["John Roe", "Sourcer", "Not Available", "Paris", "Not Available"]
    );
}

#[test]
fn empty_export_is_header_only() {
    let rows = read_rows(to_xlsx_bytes(&[]).unwrap());
    assert_eq!(rows, vec![FIELD_NAMES.map(String::from).to_vec()]);
}

#[test]
fn unicode_values_survive_the_round_trip() {
    let record = CandidateRecord {
        name: "Zoë Müller-Łukasiewicz".into(),
        title: "Responsabile Risorse Umane".into(),
        company: "Società Italiana S.p.A.".into(),
        location: "Forlì, Emilia-Romagna".into(),
        industry: "Servizi per l’impiego".into(),
    };
    let rows = read_rows(to_xlsx_bytes(std::slice::from_ref(&record)).unwrap());
    assert_eq!(rows[1], record.fields().map(String::from).to_vec());
}

#[tokio::test]
async fn write_xlsx_replaces_an_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("candidates.xlsx");

    write_xlsx(&sample_records(), &path).await.unwrap();
    write_xlsx(&[], &path).await.unwrap();

    let rows = read_rows(std::fs::read(&path).unwrap());
    assert_eq!(rows.len(), 1);
}
