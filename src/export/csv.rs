//! CSV rendering of result rows.
//!
//! Standard escaping: fields containing a comma, quote or line break are
//! quoted and embedded quotes are doubled.

use anyhow::Result;

use crate::models::CanonicalResult;

pub const HEADERS: [&str; 16] = [
    "Filepath",
    "Title",
    "ICD Code Root",
    "ICD Code Hierarchy",
    "Details - Description",
    "Details - Score",
    "Gender",
    "Unique Name",
    "Keywords",
    "Diagnosis Codes",
    "CPT Codes",
    "Language",
    "Source",
    "Document Type",
    "Status",
    "Error",
];

/// Column values of one row, in [`HEADERS`] order.
pub fn row_values(r: &CanonicalResult) -> [String; 16] {
    [
        r.filepath.clone(),
        r.title.clone(),
        r.icd_code_root.clone(),
        r.icd_code_hierarchy.clone(),
        r.details_description.clone(),
        r.details_score.clone(),
        r.gender.clone(),
        r.unique_name.clone(),
        r.keywords.clone(),
        r.diagnosis_codes.clone(),
        r.cpt_codes.clone(),
        r.language.clone(),
        r.source.clone(),
        r.document_type.clone(),
        r.status.to_string(),
        r.error.clone().unwrap_or_default(),
    ]
}

pub fn to_csv(results: &[CanonicalResult]) -> Result<Vec<u8>> {
    let mut writer = ::csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADERS)?;
    for r in results {
        writer.write_record(row_values(r))?;
    }
    Ok(writer.into_inner().map_err(|e| e.into_error())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ErrorCategory;

    #[test]
    fn tricky_field_round_trips() {
        let mut row = CanonicalResult::empty("dir/a.txt");
        row.title = "Heart, \"Attack\"\nFollow-up".to_string();
        let bytes = to_csv(&[row.clone()]).unwrap();

        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.contains("\"Heart, \"\"Attack\"\"\nFollow-up\""));

        let mut reader = ::csv::Reader::from_reader(bytes.as_slice());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), HEADERS.len());
        let records: Vec<_> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(&records[0][0], "dir/a.txt");
        assert_eq!(&records[0][1], row.title);
    }

    #[test]
    fn error_rows_carry_status_and_message() {
        let row = CanonicalResult::failed("b.pdf", ErrorCategory::Server, "No codes");
        let bytes = to_csv(&[row]).unwrap();
        let mut reader = ::csv::Reader::from_reader(bytes.as_slice());
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[14], "error");
        assert_eq!(&record[15], "No codes");
    }
}
