//! Parsers for the semi-structured per-code fields of a result row.
//!
//! The hierarchy field is a comma-joined code list. The description field is
//! `CODE: text, CODE: text, ...` where each text runs until the next
//! recognizable `CODE:` marker, and the score field is `CODE: NN%, ...`.
//! A description that itself contains `, X99:` will be split at that point.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::NOT_AVAILABLE;

/// Placeholder for a code with no parsed description.
pub const NO_DESCRIPTION: &str = "No description available";

static DESCRIPTION_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|,)\s*([A-Z][0-9][0-9A-Z](?:\.[0-9A-Z]{1,4})?)\s*:\s*")
        .expect("description marker pattern is valid")
});

static SCORE_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Z][0-9][0-9A-Z](?:\.[0-9A-Z]{1,4})?)\s*:\s*(\d{1,3})\s*%")
        .expect("score entry pattern is valid")
});

/// Split a comma-joined code list. Whitespace is trimmed; empty tokens and
/// the `N/A` placeholder are dropped.
pub fn split_codes(field: &str) -> Vec<String> {
    field
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty() && *c != NOT_AVAILABLE)
        .map(str::to_string)
        .collect()
}

/// Root prefix of a code: its first three characters.
pub fn root_of(code: &str) -> String {
    code.chars().take(3).collect()
}

/// Parse `CODE: text, CODE: text`. The first occurrence of a code wins.
pub fn parse_descriptions(field: &str) -> HashMap<String, String> {
    let markers: Vec<(usize, usize, String)> = DESCRIPTION_MARKER
        .captures_iter(field)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let code = caps.get(1)?.as_str().to_string();
            Some((whole.start(), whole.end(), code))
        })
        .collect();

    let mut out = HashMap::new();
    for (i, (_, text_start, code)) in markers.iter().enumerate() {
        let text_end = markers.get(i + 1).map(|m| m.0).unwrap_or(field.len());
        let text = field[*text_start..text_end]
            .trim_matches(|c: char| c.is_whitespace() || c == ',')
            .to_string();
        out.entry(code.clone()).or_insert(text);
    }
    out
}

/// Parse `CODE: NN%` entries. Values above 100 are clamped.
pub fn parse_scores(field: &str) -> HashMap<String, u8> {
    let mut out = HashMap::new();
    for caps in SCORE_ENTRY.captures_iter(field) {
        let (Some(code), Some(value)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let pct = value.as_str().parse::<u32>().unwrap_or(0).min(100) as u8;
        out.entry(code.as_str().to_string()).or_insert(pct);
    }
    out
}
