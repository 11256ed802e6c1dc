//! Root-code → clinical category lookup.
//!
//! An ordered table of `(prefix, category)` pairs. Lookup tries the root's
//! two-character prefix first, then its first character; anything unmatched
//! is [`OTHER`]. Every root resolves to some category.

pub const OTHER: &str = "Other";

const CATEGORIES: &[(&str, &str)] = &[
    // two-character prefixes
    ("D0", "Neoplasms"),
    ("D1", "Neoplasms"),
    ("D2", "Neoplasms"),
    ("D3", "Neoplasms"),
    ("D4", "Neoplasms"),
    ("D5", "Blood & Immune Disorders"),
    ("D6", "Blood & Immune Disorders"),
    ("D7", "Blood & Immune Disorders"),
    ("D8", "Blood & Immune Disorders"),
    ("H0", "Eye Disorders"),
    ("H1", "Eye Disorders"),
    ("H2", "Eye Disorders"),
    ("H3", "Eye Disorders"),
    ("H4", "Eye Disorders"),
    ("H5", "Eye Disorders"),
    ("H6", "Ear Disorders"),
    ("H7", "Ear Disorders"),
    ("H8", "Ear Disorders"),
    ("H9", "Ear Disorders"),
    // one-character prefixes
    ("A", "Infectious Diseases"),
    ("B", "Infectious Diseases"),
    ("C", "Neoplasms"),
    ("E", "Endocrine & Metabolic"),
    ("F", "Mental & Behavioral"),
    ("G", "Nervous System"),
    ("I", "Circulatory System"),
    ("J", "Respiratory System"),
    ("K", "Digestive System"),
    ("L", "Skin & Subcutaneous"),
    ("M", "Musculoskeletal"),
    ("N", "Genitourinary"),
    ("O", "Pregnancy & Childbirth"),
    ("P", "Perinatal Conditions"),
    ("Q", "Congenital Abnormalities"),
    ("R", "Symptoms & Signs"),
    ("S", "Injury & Poisoning"),
    ("T", "Injury & Poisoning"),
    ("U", "Special Purposes"),
    ("V", "External Causes"),
    ("W", "External Causes"),
    ("X", "External Causes"),
    ("Y", "External Causes"),
    ("Z", "Health Status Factors"),
];

/// Category label for a root code.
pub fn category_for(root: &str) -> &'static str {
    let upper = root.to_ascii_uppercase();
    for len in [2, 1] {
        let Some(prefix) = upper.get(..len) else {
            continue;
        };
        if let Some(&(_, category)) = CATEGORIES.iter().find(|(p, _)| *p == prefix) {
            return category;
        }
    }
    OTHER
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_char_prefix_wins_over_one_char() {
        assert_eq!(category_for("D50"), "Blood & Immune Disorders");
        assert_eq!(category_for("D12"), "Neoplasms");
        assert_eq!(category_for("H25"), "Eye Disorders");
        assert_eq!(category_for("H66"), "Ear Disorders");
    }

    #[test]
    fn one_char_prefix() {
        assert_eq!(category_for("E11"), "Endocrine & Metabolic");
        assert_eq!(category_for("i21"), "Circulatory System");
        assert_eq!(category_for("Z79"), "Health Status Factors");
    }

    #[test]
    fn unmapped_roots_are_other() {
        assert_eq!(category_for("D90"), OTHER);
        assert_eq!(category_for("999"), OTHER);
        assert_eq!(category_for(""), OTHER);
        assert_eq!(category_for("é1"), OTHER);
    }
}
