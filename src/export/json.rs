//! JSON export and re-import of result sets.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ExportMeta;
use crate::analytics::AnalyticsSummary;
use crate::batch::BatchCounts;
use crate::models::CanonicalResult;

#[derive(Serialize)]
struct ExportData<'a> {
    generated_at: String,
    batch_id: String,
    #[serde(flatten)]
    counts: BatchCounts,
    results: &'a [CanonicalResult],
    analytics: &'a AnalyticsSummary,
}

#[derive(Deserialize)]
struct ImportData {
    results: Vec<CanonicalResult>,
}

/// Pretty-printed export document.
pub fn to_json(
    results: &[CanonicalResult],
    summary: &AnalyticsSummary,
    meta: &ExportMeta,
) -> Result<String> {
    let data = ExportData {
        generated_at: meta.generated_at.to_rfc3339(),
        batch_id: meta.batch_id.to_string(),
        counts: BatchCounts::of(results),
        results,
        analytics: summary,
    };
    Ok(serde_json::to_string_pretty(&data)?)
}

/// Load rows from a previous JSON export. Accepts the export document or a
/// bare array of rows.
pub fn load_results_json(path: &Path) -> Result<Vec<CanonicalResult>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read results file: {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse results file: {}", path.display()))?;

    match value {
        Value::Array(_) => Ok(serde_json::from_value(value)?),
        Value::Object(_) => {
            let data: ImportData = serde_json::from_value(value)
                .with_context(|| "Results file has no valid `results` array")?;
            Ok(data.results)
        }
        _ => bail!("Results file must contain an object or an array"),
    }
}
