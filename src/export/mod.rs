//! Export sinks for a drained batch.
//!
//! Three payloads, each a pure function of the result rows and the analytics
//! derived from them at export time:
//!
//! - **CSV** ([`csv`]): one row per document.
//! - **XLSX** ([`workbook`] + [`xlsx`]): Summary, Code Details and Analytics sheets.
//! - **JSON** ([`json`]): pretty-printed rows plus batch metadata and analytics.
//!
//! Files are written as `<stem>_<UTC timestamp>_<millis>_<batch>.<ext>` into
//! the output directory, which is created if missing. `<batch>` is the first
//! eight hex digits of the batch id.

pub mod csv;
pub mod json;
pub mod workbook;
pub mod xlsx;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::analytics::{decompose, summarize};
use crate::models::CanonicalResult;
use xlsx::WorkbookSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Xlsx,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Json => "json",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            "json" => Ok(ExportFormat::Json),
            other => Err(format!(
                "unknown export format '{}': expected csv, xlsx or json",
                other
            )),
        }
    }
}

/// Identifies one export run.
#[derive(Debug, Clone)]
pub struct ExportMeta {
    pub batch_id: Uuid,
    pub generated_at: DateTime<Utc>,
}

impl ExportMeta {
    pub fn new(batch_id: Uuid) -> Self {
        Self {
            batch_id,
            generated_at: Utc::now(),
        }
    }
}

/// Write every requested format and return the paths written, in request
/// order. Repeated formats are written once.
pub fn export_all(
    results: &[CanonicalResult],
    formats: &[ExportFormat],
    output_dir: &Path,
    stem: &str,
    meta: &ExportMeta,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            output_dir.display()
        )
    })?;

    let facts = decompose(results);
    let summary = summarize(results.len(), &facts);
    let base = file_base(stem, meta);

    let mut written = Vec::new();
    let mut seen = Vec::new();
    for format in formats {
        if seen.contains(format) {
            continue;
        }
        seen.push(*format);

        let path = output_dir.join(format!("{}.{}", base, format.extension()));
        let bytes = match format {
            ExportFormat::Csv => csv::to_csv(results)?,
            ExportFormat::Json => json::to_json(results, &summary, meta)?.into_bytes(),
            ExportFormat::Xlsx => {
                let book = workbook::build_workbook(results, &facts, &summary);
                xlsx::XlsxSink.render(&book)?
            }
        };
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write export: {}", path.display()))?;
        info!(format = %format, path = %path.display(), "exported results");
        written.push(path);
    }
    Ok(written)
}

fn file_base(stem: &str, meta: &ExportMeta) -> String {
    let id = meta.batch_id.simple().to_string();
    format!(
        "{}_{}_{}",
        stem,
        meta.generated_at.format("%Y%m%d_%H%M%S_%3f"),
        &id[..8]
    )
}
