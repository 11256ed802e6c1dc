//! Terminal summaries for `bcoder scan`, `run` and `analyze`.
//!
//! Everything here writes to stdout; progress and logs stay on stderr.
//! Each printer has a `render_*` counterpart returning the text for tests.

use std::fmt::Write;
use std::path::PathBuf;

use crate::analytics::AnalyticsSummary;
use crate::batch::BatchCounts;
use crate::fileset::VirtualFileSet;
use crate::ingest::IngestReport;
use crate::models::CanonicalResult;

pub fn render_scan(set: &VirtualFileSet, report: &IngestReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "scan");
    let _ = writeln!(
        out,
        "  accepted: {} files ({})",
        set.len(),
        format_bytes(set.total_bytes())
    );
    for f in set.files() {
        let _ = writeln!(out, "    {:<60} {:>10}", f.logical_path, format_bytes(f.size()));
    }

    if !report.rejected.is_empty() {
        let _ = writeln!(out, "  unsupported: {}", report.rejected.len());
        for name in &report.rejected {
            let _ = writeln!(out, "    {}", name);
        }
    }

    for archive in &report.archives {
        let _ = writeln!(
            out,
            "  archive {}: {} accepted, {} skipped",
            archive.path,
            archive.accepted,
            archive.skipped.len()
        );
        for s in &archive.skipped {
            let _ = writeln!(out, "    skipped {}  ({})", s.path, s.reason);
        }
    }

    for (path, reason) in &report.failed_archives {
        let _ = writeln!(out, "  archive {} failed: {}", path, reason);
    }
    out
}

pub fn print_scan(set: &VirtualFileSet, report: &IngestReport) {
    print!("{}", render_scan(set, report));
}

pub fn render_run(
    counts: &BatchCounts,
    results: &[CanonicalResult],
    written: &[PathBuf],
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "run");
    let _ = writeln!(out, "  total:      {}", counts.total);
    let _ = writeln!(out, "  completed:  {}", counts.successful);
    let _ = writeln!(out, "  failed:     {}", counts.failed);

    let failures: Vec<_> = results.iter().filter(|r| r.is_error()).collect();
    if !failures.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "  Failed documents:");
        for r in failures {
            let _ = writeln!(
                out,
                "    {}  {}",
                r.filepath,
                r.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    if !written.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "  Exports:");
        for p in written {
            let _ = writeln!(out, "    {}", p.display());
        }
    }
    out
}

pub fn print_run(counts: &BatchCounts, results: &[CanonicalResult], written: &[PathBuf]) {
    print!("{}", render_run(counts, results, written));
}

pub fn render_analytics(s: &AnalyticsSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out);
    let _ = writeln!(out, "Coding Analytics");
    let _ = writeln!(out, "================");
    let _ = writeln!(out);
    let _ = writeln!(out, "  Documents:        {}", s.total_documents);
    let _ = writeln!(out, "  With codes:       {}", s.documents_with_codes);
    let _ = writeln!(out, "  Codes:            {}", s.total_codes);
    let _ = writeln!(out, "  Unique codes:     {}", s.unique_codes);
    let _ = writeln!(out, "  Avg confidence:   {}%", s.average_confidence);

    let _ = writeln!(out);
    let _ = writeln!(out, "  Confidence:");
    for t in &s.tiers {
        let _ = writeln!(out, "    {:<8} {:>6}  {:>3}%", t.tier, t.count, t.percent);
    }

    if !s.roots.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "  By root:");
        let _ = writeln!(
            out,
            "  {:<6} {:<28} {:>6} {:>6} {:>8}",
            "ROOT", "CATEGORY", "DOCS", "CODES", "AVG CONF"
        );
        let _ = writeln!(out, "  {}", "-".repeat(58));
        for r in &s.roots {
            let _ = writeln!(
                out,
                "  {:<6} {:<28} {:>6} {:>6} {:>7}%",
                r.root, r.category, r.document_count, r.code_count, r.average_confidence
            );
        }
    }

    if !s.top_codes.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "  Top codes:");
        for (i, c) in s.top_codes.iter().enumerate() {
            let _ = writeln!(
                out,
                "  {:>3}. {:<10} x{:<4} {:>3}%  {}",
                i + 1,
                c.code,
                c.count,
                c.average_confidence,
                truncate(&c.description, 60)
            );
        }
    }
    let _ = writeln!(out);
    out
}

pub fn print_analytics(s: &AnalyticsSummary) {
    print!("{}", render_analytics(s));
}

/// Format a byte count as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
