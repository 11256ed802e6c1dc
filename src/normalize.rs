//! Maps raw analysis responses onto [`CanonicalResult`] rows.
//!
//! Two response shapes are understood: the spreadsheet row
//! (`icd_code_hierarchy`, `details_description`, `details_score`, ...) and the
//! analysis shape (`diagnosis_codes` list plus `code_details` records). Missing
//! fields fall back to fixed defaults. `filepath` is always the locally-known
//! logical path; the service only ever sees a bare file name.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::analytics::parse::{root_of, split_codes};
use crate::models::{CanonicalResult, ResultStatus, NOT_AVAILABLE};

/// Build the canonical row for a successful response.
pub fn normalize(raw: &Value, local_path: &str) -> CanonicalResult {
    let mut row = CanonicalResult::empty(local_path);
    let details = code_details(raw);

    if let Some(v) = text(raw, &["title"]) {
        row.title = v;
    }
    if let Some(v) = text(raw, &["gender"]) {
        row.gender = v;
    }
    if let Some(v) = text(raw, &["unique_name"]) {
        row.unique_name = v;
    }
    if let Some(v) = text(raw, &["keywords", "enriched_keywords"]) {
        row.keywords = v;
    }

    row.icd_code_hierarchy = text(raw, &["icd_code_hierarchy", "diagnosis_codes"])
        .or_else(|| join_details(&details, |d| d.code.clone()))
        .unwrap_or_default();
    row.details_description = text(raw, &["details_description"])
        .or_else(|| join_details(&details, |d| format!("{}: {}", d.code, d.description)))
        .unwrap_or_default();
    row.details_score = text(raw, &["details_score"])
        .or_else(|| join_details(&details, |d| format!("{}: {}%", d.code, d.confidence)))
        .unwrap_or_default();

    row.icd_code_root = text(raw, &["icd_code_root"])
        .or_else(|| derive_roots(&row.icd_code_hierarchy))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());
    row.diagnosis_codes =
        text(raw, &["diagnosis_codes"]).unwrap_or_else(|| row.icd_code_hierarchy.clone());

    if let Some(v) = text(raw, &["cpt_codes"]) {
        row.cpt_codes = v;
    }
    if let Some(v) = text(raw, &["language"]) {
        row.language = v;
    }
    if let Some(v) = text(raw, &["source"]) {
        row.source = v;
    }
    if let Some(v) = text(raw, &["document_type"]) {
        row.document_type = v;
    }

    row.status = ResultStatus::Completed;
    row
}

/// First present, non-blank field among `keys`, rendered as text.
/// Lists are comma-joined.
fn text(raw: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        let rendered = match raw.get(*key)? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Array(items) => items
                .iter()
                .filter_map(scalar_text)
                .collect::<Vec<_>>()
                .join(", "),
            Value::Null | Value::Object(_) => return None,
        };
        if rendered.trim().is_empty() {
            None
        } else {
            Some(rendered)
        }
    })
}

fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

struct CodeDetail {
    code: String,
    description: String,
    confidence: u8,
}

fn code_details(raw: &Value) -> Vec<CodeDetail> {
    let Some(items) = raw.get("code_details").and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let code = item
                .get("code")
                .or_else(|| item.get("icd_code"))
                .and_then(Value::as_str)?
                .trim()
                .to_string();
            if code.is_empty() {
                return None;
            }
            let description = ["enhanced_description", "description"]
                .iter()
                .find_map(|k| item.get(*k).and_then(Value::as_str))
                .unwrap_or_default()
                .to_string();
            let confidence = item
                .get("confidence")
                .or_else(|| item.get("confidence_score"))
                .map(confidence_percent)
                .unwrap_or(0);
            Some(CodeDetail {
                code,
                description,
                confidence,
            })
        })
        .collect()
}

/// `"95%"`, `95` and `0.95` all read as 95.
fn confidence_percent(v: &Value) -> u8 {
    let pct = match v {
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        Value::Number(n) => n.as_f64().map(|f| if f <= 1.0 { f * 100.0 } else { f }),
        _ => None,
    };
    pct.map(|p| p.clamp(0.0, 100.0).round() as u8).unwrap_or(0)
}

fn join_details(details: &[CodeDetail], render: impl Fn(&CodeDetail) -> String) -> Option<String> {
    if details.is_empty() {
        None
    } else {
        Some(details.iter().map(render).collect::<Vec<_>>().join(", "))
    }
}

fn derive_roots(hierarchy: &str) -> Option<String> {
    let roots: BTreeSet<String> = split_codes(hierarchy)
        .into_iter()
        .map(|c| root_of(&c))
        .collect();
    if roots.is_empty() {
        None
    } else {
        Some(roots.into_iter().collect::<Vec<_>>().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn spreadsheet_shape_maps_field_by_field() {
        let raw = json!({
            "filepath": "Heart Attack.pdf",
            "title": "Heart Attack",
            "icd_code_root": "I21",
            "icd_code_hierarchy": "I21.9, I25.2",
            "details_description": "I21.9: Acute MI, I25.2: Old MI",
            "details_score": "I21.9: 95%, I25.2: 72%",
            "gender": "Both",
            "unique_name": "Heart_Attack",
            "keywords": "cardiac, infarction",
            "language": "Spanish"
        });
        let row = normalize(&raw, "cardio/2024/Heart Attack.pdf");
        assert_eq!(row.filepath, "cardio/2024/Heart Attack.pdf");
        assert_eq!(row.title, "Heart Attack");
        assert_eq!(row.icd_code_hierarchy, "I21.9, I25.2");
        assert_eq!(row.diagnosis_codes, "I21.9, I25.2");
        assert_eq!(row.language, "Spanish");
        assert_eq!(row.status, ResultStatus::Completed);
        assert!(row.error.is_none());
    }

    #[test]
    fn server_path_never_overrides_local_path() {
        let raw = json!({"filepath": "/tmp/upload/evil.pdf", "title": "X"});
        let row = normalize(&raw, "batch.zip/inner/real.pdf");
        assert_eq!(row.filepath, "batch.zip/inner/real.pdf");
    }

    #[test]
    fn empty_response_yields_defaults() {
        let row = normalize(&json!({}), "a.txt");
        assert_eq!(row.title, "N/A");
        assert_eq!(row.gender, "N/A");
        assert_eq!(row.icd_code_root, "N/A");
        assert_eq!(row.keywords, "");
        assert_eq!(row.icd_code_hierarchy, "");
        assert_eq!(row.language, "English");
        assert_eq!(row.source, "AI Medical Coding System");
        assert_eq!(row.document_type, "Patient Education");
    }

    #[test]
    fn null_and_blank_fields_fall_back() {
        let raw = json!({"title": null, "gender": "  ", "language": ""});
        let row = normalize(&raw, "a.txt");
        assert_eq!(row.title, "N/A");
        assert_eq!(row.gender, "N/A");
        assert_eq!(row.language, "English");
    }

    #[test]
    fn legacy_field_is_kept_when_present() {
        let raw = json!({"icd_code_hierarchy": "E11.9", "diagnosis_codes": "E11"});
        let row = normalize(&raw, "a.txt");
        assert_eq!(row.diagnosis_codes, "E11");
    }

    #[test]
    fn analysis_shape_is_synthesized() {
        let raw = json!({
            "title": "Diabetes",
            "enriched_keywords": "glucose, insulin",
            "diagnosis_codes": ["E11.9", "E11.65", "Z79.4"],
            "code_details": [
                {"code": "E11.9", "enhanced_description": "Type 2 diabetes", "confidence": "92%"},
                {"code": "E11.65", "enhanced_description": "With hyperglycemia", "confidence": 0.8},
                {"code": "Z79.4", "enhanced_description": "Insulin use", "confidence": 64}
            ]
        });
        let row = normalize(&raw, "endo/diabetes.html");
        assert_eq!(row.keywords, "glucose, insulin");
        assert_eq!(row.icd_code_hierarchy, "E11.9, E11.65, Z79.4");
        assert_eq!(
            row.details_description,
            "E11.9: Type 2 diabetes, E11.65: With hyperglycemia, Z79.4: Insulin use"
        );
        assert_eq!(row.details_score, "E11.9: 92%, E11.65: 80%, Z79.4: 64%");
        assert_eq!(row.icd_code_root, "E11, Z79");
    }
}
