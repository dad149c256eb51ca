//! Industry-affiliation detection.
//!
//! An affiliation counts as pharmaceutical/biotech when it contains one of a
//! handful of company keywords as a whole word, ignoring case. Matching is on
//! word boundaries, so "Incorporated" does not count as "Inc" and
//! "Pharmacology" does not count as "Pharma".

use regex::Regex;

/// Keywords that mark a company affiliation.
pub const PHARMA_KEYWORDS: &[&str] = &[
    "Inc",
    "Ltd",
    "Pharma",
    "Biotech",
    "Laboratories",
    "Pharmaceuticals",
];

fn pharma_regex() -> &'static Regex {
    use std::sync::OnceLock;
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let alternation = PHARMA_KEYWORDS.join("|");
        Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).unwrap()
    })
}

fn email_regex() -> &'static Regex {
    use std::sync::OnceLock;
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(?:\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}").unwrap()
    })
}

/// True if `affiliation` names a pharmaceutical or biotech company.
pub fn is_pharma_biotech(affiliation: &str) -> bool {
    pharma_regex().is_match(affiliation)
}

/// First email address embedded in an affiliation string.
///
/// PubMed puts contact addresses inside the affiliation text, usually as
/// "Electronic address: someone@example.com.".
pub fn extract_email(affiliation: &str) -> Option<String> {
    email_regex()
        .find(affiliation)
        .map(|m| m.as_str().to_string())
}
