//! Multi-tender compilation guard.
//!
//! Some portals publish one notice PDF that bundles dozens of unrelated
//! tenders. Extracting metadata from such a compilation poisons the record
//! with fields from the wrong tender, so a flagged notice is excluded from
//! selection entirely and the waterfall falls through to the next category.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::config::MULTI_TENDER_REF_LIMIT;

/// Phrases that introduce a list of tenders.
const MULTI_TENDER_PHRASES: [&str; 7] = [
    "appels d'offres suivants",
    "marchés suivants",
    "consultations suivantes",
    "liste des appels",
    "tableau des marchés",
    "les références ci-après",
    "les marchés ci-après",
];

fn guard_pattern(regex_str: &str) -> Regex {
    Regex::new(regex_str).expect("Invalid reference pattern")
}

/// Shapes a tender reference number takes in notice text.
static REFERENCE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        guard_pattern(r"n[°o]?\s*\d+[/\-]\d{4}"),
        guard_pattern(r"ref[:\s]+\d+[/\-]\d{4}"),
        guard_pattern(r"\d+[/\-]ao[/\-]\d{4}"),
    ]
});

/// True when the sample reads like a list of several tenders: either a list
/// phrase appears, or more than [`MULTI_TENDER_REF_LIMIT`] reference-shaped
/// substrings do. `tender_reference` is log context only.
pub fn is_multi_tender_compilation(sample_text: &str, tender_reference: Option<&str>) -> bool {
    let text = sample_text.to_lowercase();
    if text.trim().is_empty() {
        return false;
    }

    for phrase in MULTI_TENDER_PHRASES {
        if text.contains(phrase) {
            warn!(
                phrase,
                reference = tender_reference.unwrap_or("-"),
                "Notice flagged as multi-tender compilation"
            );
            return true;
        }
    }

    let reference_count: usize = REFERENCE_PATTERNS
        .iter()
        .map(|pattern| pattern.find_iter(&text).count())
        .sum();
    if reference_count > MULTI_TENDER_REF_LIMIT {
        warn!(
            reference_count,
            reference = tender_reference.unwrap_or("-"),
            "Notice flagged as multi-tender compilation"
        );
        return true;
    }

    false
}
