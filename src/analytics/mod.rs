//! Analytics over a drained batch.
//!
//! [`decompose`] turns each result's composite code fields into
//! [`AtomicCodeFact`]s; [`summarize`] aggregates those facts into an
//! [`AnalyticsSummary`]. Both are recomputed from scratch on every call.
//!
//! All means and percentages are rounded to the nearest integer and are `0`
//! when their denominator is zero.

pub mod category;
pub mod parse;

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::models::CanonicalResult;
use parse::{parse_descriptions, parse_scores, root_of, split_codes, NO_DESCRIPTION};

/// Number of rows kept in the code frequency table.
pub const TOP_CODES: usize = 15;

/// Fixed confidence bands: `>= 90` High, `>= 70` Medium, otherwise Low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    pub const ALL: [ConfidenceTier; 3] = [
        ConfidenceTier::High,
        ConfidenceTier::Medium,
        ConfidenceTier::Low,
    ];

    pub fn from_confidence(confidence: u8) -> Self {
        if confidence >= 90 {
            ConfidenceTier::High
        } else if confidence >= 70 {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ConfidenceTier::High => "High",
            ConfidenceTier::Medium => "Medium",
            ConfidenceTier::Low => "Low",
        }
    }
}

impl std::fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.label())
    }
}

/// One (document, code) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AtomicCodeFact {
    pub filepath: String,
    pub title: String,
    pub code: String,
    pub root: String,
    pub category: &'static str,
    pub description: String,
    pub confidence: u8,
    pub tier: ConfidenceTier,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootStats {
    pub root: String,
    pub category: &'static str,
    pub document_count: usize,
    pub code_count: usize,
    pub average_confidence: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryStats {
    pub category: &'static str,
    pub document_count: usize,
    pub code_count: usize,
    pub average_confidence: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierStats {
    pub tier: ConfidenceTier,
    pub count: usize,
    pub percent: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeFrequency {
    pub code: String,
    pub description: String,
    pub count: usize,
    pub average_confidence: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyticsSummary {
    pub total_documents: usize,
    pub documents_with_codes: usize,
    pub total_codes: usize,
    pub unique_codes: usize,
    pub average_confidence: u32,
    /// Sorted by code count, descending; ties keep first-seen order.
    pub roots: Vec<RootStats>,
    pub categories: Vec<CategoryStats>,
    /// Always High, Medium, Low in that order.
    pub tiers: Vec<TierStats>,
    pub top_codes: Vec<CodeFrequency>,
}

/// Decompose and summarize in one step.
pub fn analyze(results: &[CanonicalResult]) -> AnalyticsSummary {
    let facts = decompose(results);
    summarize(results.len(), &facts)
}

/// Split every result's hierarchy into facts, pairing each code with its
/// parsed description and score by exact code match.
pub fn decompose(results: &[CanonicalResult]) -> Vec<AtomicCodeFact> {
    let mut facts = Vec::new();
    for result in results {
        let codes = split_codes(&result.icd_code_hierarchy);
        if codes.is_empty() {
            continue;
        }
        let descriptions = parse_descriptions(&result.details_description);
        let scores = parse_scores(&result.details_score);

        for code in codes {
            let root = root_of(&code);
            let confidence = scores.get(&code).copied().unwrap_or(0);
            facts.push(AtomicCodeFact {
                filepath: result.filepath.clone(),
                title: result.title.clone(),
                category: category::category_for(&root),
                description: descriptions
                    .get(&code)
                    .filter(|d| !d.is_empty())
                    .cloned()
                    .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
                confidence,
                tier: ConfidenceTier::from_confidence(confidence),
                root,
                code,
            });
        }
    }
    facts
}

/// Aggregate facts for a batch of `total_documents` results.
pub fn summarize(total_documents: usize, facts: &[AtomicCodeFact]) -> AnalyticsSummary {
    let documents_with_codes = facts
        .iter()
        .map(|f| f.filepath.as_str())
        .collect::<HashSet<_>>()
        .len();
    let unique_codes = facts
        .iter()
        .map(|f| f.code.as_str())
        .collect::<HashSet<_>>()
        .len();
    let confidence_sum: u64 = facts.iter().map(|f| f.confidence as u64).sum();

    let roots = group(facts, |f| f.root.clone())
        .into_iter()
        .map(|g| RootStats {
            category: category::category_for(&g.key),
            root: g.key,
            document_count: g.documents.len(),
            code_count: g.count,
            average_confidence: mean(g.confidence_sum, g.count),
        })
        .collect();

    let categories = group(facts, |f| f.category)
        .into_iter()
        .map(|g| CategoryStats {
            category: g.key,
            document_count: g.documents.len(),
            code_count: g.count,
            average_confidence: mean(g.confidence_sum, g.count),
        })
        .collect();

    let tiers = ConfidenceTier::ALL
        .iter()
        .map(|tier| {
            let count = facts.iter().filter(|f| f.tier == *tier).count();
            TierStats {
                tier: *tier,
                count,
                percent: percent(count, facts.len()),
            }
        })
        .collect();

    let top_codes = group(facts, |f| f.code.clone())
        .into_iter()
        .take(TOP_CODES)
        .map(|g| CodeFrequency {
            description: g.first_description,
            code: g.key,
            count: g.count,
            average_confidence: mean(g.confidence_sum, g.count),
        })
        .collect();

    AnalyticsSummary {
        total_documents,
        documents_with_codes,
        total_codes: facts.len(),
        unique_codes,
        average_confidence: mean(confidence_sum, facts.len()),
        roots,
        categories,
        tiers,
        top_codes,
    }
}

struct Group<'a, K> {
    key: K,
    documents: HashSet<&'a str>,
    count: usize,
    confidence_sum: u64,
    first_description: String,
}

/// Group facts by `key`, in first-seen order, then stable-sort by count
/// descending so ties keep that order.
fn group<'a, K, F>(facts: &'a [AtomicCodeFact], key: F) -> Vec<Group<'a, K>>
where
    K: Eq + std::hash::Hash + Clone,
    F: Fn(&AtomicCodeFact) -> K,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<Group<'a, K>> = Vec::new();
    for fact in facts {
        let k = key(fact);
        let slot = *index.entry(k.clone()).or_insert_with(|| {
            groups.push(Group {
                key: k,
                documents: HashSet::new(),
                count: 0,
                confidence_sum: 0,
                first_description: fact.description.clone(),
            });
            groups.len() - 1
        });
        let g = &mut groups[slot];
        g.documents.insert(fact.filepath.as_str());
        g.count += 1;
        g.confidence_sum += fact.confidence as u64;
    }
    groups.sort_by(|a, b| b.count.cmp(&a.count));
    groups
}

fn mean(sum: u64, n: usize) -> u32 {
    if n == 0 {
        0
    } else {
        (sum as f64 / n as f64).round() as u32
    }
}

fn percent(part: usize, total: usize) -> u32 {
    if total == 0 {
        0
    } else {
        (part as f64 * 100.0 / total as f64).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(path: &str, hierarchy: &str, descriptions: &str, scores: &str) -> CanonicalResult {
        let mut r = CanonicalResult::empty(path);
        r.icd_code_hierarchy = hierarchy.to_string();
        r.details_description = descriptions.to_string();
        r.details_score = scores.to_string();
        r
    }

    #[test]
    fn two_codes_become_two_facts() {
        let results = vec![row(
            "a.pdf",
            "A10,B20",
            "A10: desc one, B20: desc two",
            "A10: 95%, B20: 65%",
        )];
        let facts = decompose(&results);
        assert_eq!(facts.len(), 2);

        assert_eq!(facts[0].code, "A10");
        assert_eq!(facts[0].description, "desc one");
        assert_eq!(facts[0].confidence, 95);
        assert_eq!(facts[0].tier, ConfidenceTier::High);
        assert_eq!(facts[0].category, "Infectious Diseases");

        assert_eq!(facts[1].code, "B20");
        assert_eq!(facts[1].description, "desc two");
        assert_eq!(facts[1].confidence, 65);
        // 65 is below the Medium threshold of 70.
        assert_eq!(facts[1].tier, ConfidenceTier::Low);
    }

    #[test]
    fn tier_boundaries() {
        assert_eq!(ConfidenceTier::from_confidence(100), ConfidenceTier::High);
        assert_eq!(ConfidenceTier::from_confidence(90), ConfidenceTier::High);
        assert_eq!(ConfidenceTier::from_confidence(89), ConfidenceTier::Medium);
        assert_eq!(ConfidenceTier::from_confidence(70), ConfidenceTier::Medium);
        assert_eq!(ConfidenceTier::from_confidence(69), ConfidenceTier::Low);
        assert_eq!(ConfidenceTier::from_confidence(0), ConfidenceTier::Low);
    }

    #[test]
    fn empty_results_give_zeros() {
        let s = analyze(&[]);
        assert_eq!(s.total_documents, 0);
        assert_eq!(s.total_codes, 0);
        assert_eq!(s.average_confidence, 0);
        assert!(s.roots.is_empty());
        assert!(s.top_codes.is_empty());
        assert_eq!(s.tiers.len(), 3);
        assert!(s.tiers.iter().all(|t| t.count == 0 && t.percent == 0));
    }

    #[test]
    fn missing_description_and_score_use_defaults() {
        let facts = decompose(&[row("a.txt", "E11.9", "", "")]);
        assert_eq!(facts[0].description, NO_DESCRIPTION);
        assert_eq!(facts[0].confidence, 0);
        assert_eq!(facts[0].tier, ConfidenceTier::Low);
        assert_eq!(facts[0].root, "E11");
    }

    #[test]
    fn error_rows_without_codes_contribute_no_facts() {
        let failed =
            CanonicalResult::failed("b.pdf", crate::models::ErrorCategory::Server, "nope");
        let s = analyze(&[row("a.txt", "E11.9", "", "E11.9: 80%"), failed]);
        assert_eq!(s.total_documents, 2);
        assert_eq!(s.documents_with_codes, 1);
        assert_eq!(s.total_codes, 1);
    }

    #[test]
    fn aggregates_roots_tiers_and_frequencies() {
        let results = vec![
            row(
                "one.pdf",
                "E11.9, E11.65, I10",
                "E11.9: Type 2 diabetes, E11.65: Hyperglycemia, I10: Hypertension",
                "E11.9: 95%, E11.65: 80%, I10: 60%",
            ),
            row(
                "two.pdf",
                "I10, E11.9",
                "I10: Essential hypertension, E11.9: Diabetes",
                "I10: 91%, E11.9: 88%",
            ),
        ];
        let s = analyze(&results);
        assert_eq!(s.total_codes, 5);
        assert_eq!(s.unique_codes, 3);
        assert_eq!(s.documents_with_codes, 2);
        // (95 + 80 + 60 + 91 + 88) / 5 = 82.8
        assert_eq!(s.average_confidence, 83);

        assert_eq!(s.roots[0].root, "E11");
        assert_eq!(s.roots[0].code_count, 3);
        assert_eq!(s.roots[0].document_count, 2);
        // (95 + 80 + 88) / 3 = 87.67
        assert_eq!(s.roots[0].average_confidence, 88);
        assert_eq!(s.roots[1].root, "I10");
        assert_eq!(s.roots[1].category, "Circulatory System");

        let tiers: Vec<(ConfidenceTier, usize, u32)> =
            s.tiers.iter().map(|t| (t.tier, t.count, t.percent)).collect();
        assert_eq!(
            tiers,
            vec![
                (ConfidenceTier::High, 2, 40),
                (ConfidenceTier::Medium, 2, 40),
                (ConfidenceTier::Low, 1, 20),
            ]
        );

        // E11.9 and I10 both appear twice; E11.9 was seen first.
        assert_eq!(s.top_codes[0].code, "E11.9");
        assert_eq!(s.top_codes[0].count, 2);
        assert_eq!(s.top_codes[0].description, "Type 2 diabetes");
        assert_eq!(s.top_codes[1].code, "I10");
        assert_eq!(s.top_codes[2].code, "E11.65");
    }

    #[test]
    fn top_codes_are_capped() {
        let codes: Vec<String> = (0..20).map(|i| format!("A{:02}", i)).collect();
        let results = vec![row("a.pdf", &codes.join(", "), "", "")];
        let s = analyze(&results);
        assert_eq!(s.unique_codes, 20);
        assert_eq!(s.top_codes.len(), TOP_CODES);
        assert_eq!(s.top_codes[0].code, "A00");
    }
}
