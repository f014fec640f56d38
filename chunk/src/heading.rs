//! Section heading detection shared by the chunker and the classifier's
//! tie-break rule.

use std::sync::LazyLock;

use regex::Regex;

/// Headers the policy domain uses often enough to recognize by keyword
/// alone, regardless of casing or numbering.
pub const KEYWORD_HEADERS: &[&str] = &[
    "EXCLUSIONS",
    "COVERAGE",
    "DEFINITIONS",
    "LIMITATIONS",
    "OBLIGATIONS",
];

static NUMBERED_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d+)*\s+[A-Z][A-Za-z0-9 ,'&/-]{2,80}$").unwrap());

/// Whether a line reads as a section heading: a short all-caps line, a
/// numbered title-cased line (`"3.2 Water Damage"`), or one of the known
/// keyword headers.
#[must_use]
pub fn is_heading(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.chars().count() > 80 {
        return false;
    }

    let upper = trimmed.to_uppercase();
    if KEYWORD_HEADERS.iter().any(|kw| upper == *kw) {
        return true;
    }

    let has_alpha = trimmed.chars().any(char::is_alphabetic);
    let all_caps = has_alpha
        && trimmed
            .chars()
            .filter(|c| c.is_alphabetic())
            .all(char::is_uppercase);
    if all_caps && trimmed.split_whitespace().count() <= 8 {
        return true;
    }

    NUMBERED_HEADING.is_match(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_all_caps() {
        assert!(is_heading("EXCLUSIONS"));
        assert!(is_heading("GENERAL CONDITIONS"));
    }

    #[test]
    fn recognizes_numbered_title() {
        assert!(is_heading("3.2 Water Damage"));
        assert!(is_heading("12 Definitions"));
    }

    #[test]
    fn recognizes_keyword_header_any_case() {
        assert!(is_heading("coverage"));
    }

    #[test]
    fn rejects_ordinary_sentence() {
        assert!(!is_heading("The insured must notify us within 30 days."));
    }

    #[test]
    fn rejects_overlong_line() {
        let long = "A".repeat(100);
        assert!(!is_heading(&long));
    }
}
