//! Per-document language detection for candidate selection.
//!
//! Tender bundles routinely ship the same document in French and Arabic
//! versions. Detection combines filename markers with content heuristics;
//! a document showing both French and Arabic signals is ambiguous and
//! treated as neutral.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::ARABIC_SCRIPT_FLOOR;

/// Verdict for one candidate file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedLanguage {
    French,
    Arabic,
    Neutral,
}

fn marker(regex_str: &str) -> Regex {
    Regex::new(regex_str).expect("Invalid language marker pattern")
}

/// Filename markers for a French version, matched against the lowercased
/// basename. The bare `fr` token requires separators or string edges.
static FRENCH_FILENAME_MARKERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        marker(r"[\s_\-\.]fr[\s_\-\.]"),
        marker(r"[\s_\-\.]fr$"),
        marker(r"^fr[\s_\-\.]"),
        marker(r"\(fr\)"),
        marker(r"fran[cç]ais"),
        marker(r"version[\s_\-]*fr"),
        marker(r"\bver[\s_\-]+fr\b"),
    ]
});

static ARABIC_FILENAME_MARKERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        marker(r"[\s_\-\.]ar[\s_\-\.]"),
        marker(r"[\s_\-\.]ar$"),
        marker(r"^ar[\s_\-\.]"),
        marker(r"\(ar\)"),
        marker(r"arabe"),
        marker(r"arabic"),
        marker(r"version[\s_\-]*ar"),
        marker(r"\bver[\s_\-]+ar\b"),
    ]
});

/// Legal boilerplate that only appears in the French rendition. Two distinct
/// phrases are required; one can survive in an Arabic document's letterhead.
const FRENCH_CONTENT_MARKERS: [&str; 6] = [
    "règlement de consultation",
    "cahier des prescriptions",
    "avis d'appel d'offres",
    "marché public",
    "le soumissionnaire",
    "pièces justificatives",
];

const MIN_CONTENT_HITS: usize = 2;

pub fn detect_language(sample_text: &str, filename: &str) -> DetectedLanguage {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .to_lowercase();
    match (french_signal(sample_text, &name), arabic_signal(sample_text, &name)) {
        (true, true) | (false, false) => DetectedLanguage::Neutral,
        (true, false) => DetectedLanguage::French,
        (false, true) => DetectedLanguage::Arabic,
    }
}

fn french_signal(sample_text: &str, name: &str) -> bool {
    if FRENCH_FILENAME_MARKERS.iter().any(|m| m.is_match(name)) {
        return true;
    }
    let text = sample_text.to_lowercase();
    let hits = FRENCH_CONTENT_MARKERS
        .iter()
        .filter(|phrase| text.contains(*phrase))
        .count();
    hits >= MIN_CONTENT_HITS
}

fn arabic_signal(sample_text: &str, name: &str) -> bool {
    if ARABIC_FILENAME_MARKERS.iter().any(|m| m.is_match(name)) {
        return true;
    }
    if name.chars().any(is_arabic_char) {
        return true;
    }
    let arabic = sample_text.chars().filter(|c| is_arabic_char(*c)).count();
    let latin = sample_text.chars().filter(char::is_ascii_alphabetic).count();
    arabic > ARABIC_SCRIPT_FLOOR && arabic > latin
}

fn is_arabic_char(c: char) -> bool {
    matches!(c, '\u{0600}'..='\u{06FF}')
}
