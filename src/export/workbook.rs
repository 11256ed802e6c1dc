//! Tabular workbook model handed to a [`WorkbookSink`](super::xlsx::WorkbookSink).

use crate::analytics::{AnalyticsSummary, AtomicCodeFact};
use crate::models::CanonicalResult;

use super::csv::{row_values, HEADERS};

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<usize> for Cell {
    fn from(n: usize) -> Self {
        Cell::Number(n as f64)
    }
}

impl From<u32> for Cell {
    fn from(n: u32) -> Self {
        Cell::Number(n as f64)
    }
}

impl From<u8> for Cell {
    fn from(n: u8) -> Self {
        Cell::Number(n as f64)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rows: Vec::new(),
        }
    }

    pub fn push<I, C>(&mut self, row: I)
    where
        I: IntoIterator<Item = C>,
        C: Into<Cell>,
    {
        self.rows.push(row.into_iter().map(Into::into).collect());
    }

    pub fn blank(&mut self) {
        self.rows.push(Vec::new());
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

pub const SUMMARY_SHEET: &str = "Summary";
pub const DETAILS_SHEET: &str = "Code Details";
pub const ANALYTICS_SHEET: &str = "Analytics";

/// Three sheets: the result rows, one row per code fact, and the analytics
/// dashboard tables stacked vertically.
pub fn build_workbook(
    results: &[CanonicalResult],
    facts: &[AtomicCodeFact],
    summary: &AnalyticsSummary,
) -> Workbook {
    let mut rows = Sheet::new(SUMMARY_SHEET);
    rows.push(HEADERS);
    for r in results {
        rows.push(row_values(r));
    }

    let mut details = Sheet::new(DETAILS_SHEET);
    details.push([
        "Filepath",
        "Title",
        "ICD Code",
        "Root",
        "Category",
        "Description",
        "Confidence",
        "Tier",
    ]);
    for f in facts {
        details.rows.push(vec![
            f.filepath.as_str().into(),
            f.title.as_str().into(),
            f.code.as_str().into(),
            f.root.as_str().into(),
            f.category.into(),
            f.description.as_str().into(),
            f.confidence.into(),
            f.tier.label().into(),
        ]);
    }

    Workbook {
        sheets: vec![rows, details, analytics_sheet(summary)],
    }
}

fn analytics_sheet(s: &AnalyticsSummary) -> Sheet {
    let mut sheet = Sheet::new(ANALYTICS_SHEET);

    sheet.push(["Overview"]);
    sheet.rows.push(vec!["Total Documents".into(), s.total_documents.into()]);
    sheet.rows.push(vec![
        "Documents With Codes".into(),
        s.documents_with_codes.into(),
    ]);
    sheet.rows.push(vec!["Total Codes".into(), s.total_codes.into()]);
    sheet.rows.push(vec!["Unique Codes".into(), s.unique_codes.into()]);
    sheet.rows.push(vec![
        "Average Confidence (%)".into(),
        s.average_confidence.into(),
    ]);
    sheet.blank();

    sheet.push(["Root Code Statistics"]);
    sheet.push(["Root", "Category", "Documents", "Codes", "Avg Confidence (%)"]);
    for r in &s.roots {
        sheet.rows.push(vec![
            r.root.as_str().into(),
            r.category.into(),
            r.document_count.into(),
            r.code_count.into(),
            r.average_confidence.into(),
        ]);
    }
    sheet.blank();

    sheet.push(["Category Statistics"]);
    sheet.push(["Category", "Documents", "Codes", "Avg Confidence (%)"]);
    for c in &s.categories {
        sheet.rows.push(vec![
            c.category.into(),
            c.document_count.into(),
            c.code_count.into(),
            c.average_confidence.into(),
        ]);
    }
    sheet.blank();

    sheet.push(["Confidence Distribution"]);
    sheet.push(["Tier", "Count", "Percent (%)"]);
    for t in &s.tiers {
        sheet.rows.push(vec![
            t.tier.label().into(),
            t.count.into(),
            t.percent.into(),
        ]);
    }
    sheet.blank();

    sheet.push(["Top Codes"]);
    sheet.push(["Rank", "Code", "Description", "Count", "Avg Confidence (%)"]);
    for (rank, c) in s.top_codes.iter().enumerate() {
        sheet.rows.push(vec![
            (rank + 1).into(),
            c.code.as_str().into(),
            c.description.as_str().into(),
            c.count.into(),
            c.average_confidence.into(),
        ]);
    }

    sheet
}
