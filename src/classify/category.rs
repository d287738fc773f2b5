//! Document categories and the deterministic classification heuristics.
//!
//! Filename patterns always win over content keywords, and categories are
//! checked in a fixed priority order, so classification is reproducible for
//! a given (sample, filename) pair.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Closed set of tender document roles, serialized as the uppercase domain code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DocumentCategory {
    /// Avis de consultation / d'appel d'offres, the published announcement.
    #[serde(rename = "AVIS")]
    PrimaryNotice,
    /// Règlement de consultation, the procedural rules for bidders.
    #[serde(rename = "RC")]
    Rules,
    /// Cahier des prescriptions spéciales, the specification body.
    #[serde(rename = "CPS")]
    Specification,
    #[serde(rename = "ANNEXE")]
    Addendum,
    /// Bordereau des prix / détail estimatif.
    #[serde(rename = "BPDE")]
    PriceSchedule,
    /// Acte d'engagement.
    #[serde(rename = "AE")]
    CommitmentForm,
    /// Sous-détail des prix / décomposition du montant global.
    #[serde(rename = "DSH")]
    CostBreakdown,
    #[serde(rename = "CCAG")]
    GeneralAdminClauses,
    /// Cahier des clauses techniques particulières.
    #[serde(rename = "CCTP")]
    TechnicalClauses,
    /// Bordereau des quantités.
    #[serde(rename = "BQ")]
    QuantitySchedule,
    /// Devis quantitatif estimatif.
    #[serde(rename = "DQE")]
    EstimatedQuantities,
    #[serde(rename = "OTHER")]
    Other,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl DocumentCategory {
    /// Uppercase wire code, stable across serialization.
    pub fn as_code(&self) -> &'static str {
        match self {
            DocumentCategory::PrimaryNotice => "AVIS",
            DocumentCategory::Rules => "RC",
            DocumentCategory::Specification => "CPS",
            DocumentCategory::Addendum => "ANNEXE",
            DocumentCategory::PriceSchedule => "BPDE",
            DocumentCategory::CommitmentForm => "AE",
            DocumentCategory::CostBreakdown => "DSH",
            DocumentCategory::GeneralAdminClauses => "CCAG",
            DocumentCategory::TechnicalClauses => "CCTP",
            DocumentCategory::QuantitySchedule => "BQ",
            DocumentCategory::EstimatedQuantities => "DQE",
            DocumentCategory::Other => "OTHER",
            DocumentCategory::Unknown => "UNKNOWN",
        }
    }

    /// Case-insensitive code lookup.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "AVIS" => Some(DocumentCategory::PrimaryNotice),
            "RC" => Some(DocumentCategory::Rules),
            "CPS" => Some(DocumentCategory::Specification),
            "ANNEXE" => Some(DocumentCategory::Addendum),
            "BPDE" => Some(DocumentCategory::PriceSchedule),
            "AE" => Some(DocumentCategory::CommitmentForm),
            "DSH" => Some(DocumentCategory::CostBreakdown),
            "CCAG" => Some(DocumentCategory::GeneralAdminClauses),
            "CCTP" => Some(DocumentCategory::TechnicalClauses),
            "BQ" => Some(DocumentCategory::QuantitySchedule),
            "DQE" => Some(DocumentCategory::EstimatedQuantities),
            "OTHER" => Some(DocumentCategory::Other),
            "UNKNOWN" => Some(DocumentCategory::Unknown),
            _ => None,
        }
    }

    /// Categories the heuristics can assign, in check-priority order.
    pub fn classifiable() -> &'static [DocumentCategory] {
        &[
            DocumentCategory::PrimaryNotice,
            DocumentCategory::Rules,
            DocumentCategory::Specification,
            DocumentCategory::Addendum,
            DocumentCategory::PriceSchedule,
            DocumentCategory::CommitmentForm,
            DocumentCategory::CostBreakdown,
            DocumentCategory::GeneralAdminClauses,
            DocumentCategory::TechnicalClauses,
            DocumentCategory::QuantitySchedule,
            DocumentCategory::EstimatedQuantities,
        ]
    }
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

struct FilenamePattern {
    category: DocumentCategory,
    regex: Regex,
}

fn pattern(category: DocumentCategory, regex_str: &str) -> FilenamePattern {
    FilenamePattern {
        category,
        regex: Regex::new(regex_str).expect("Invalid filename pattern"),
    }
}

/// Filename markers, grouped by category in check-priority order. Matching is
/// first-hit on the lowercased basename.
static FILENAME_PATTERNS: LazyLock<Vec<FilenamePattern>> = LazyLock::new(|| {
    vec![
        pattern(DocumentCategory::PrimaryNotice, r"\bavis\b"),
        pattern(DocumentCategory::PrimaryNotice, r"\bavis[\s_-]"),
        pattern(DocumentCategory::PrimaryNotice, r"[\s_-]avis\b"),
        pattern(DocumentCategory::PrimaryNotice, r"avis[\s_-]*(ar|fr)"),
        pattern(DocumentCategory::Rules, r"\brc\b"),
        pattern(DocumentCategory::Rules, r"\brcdp\b"),
        pattern(DocumentCategory::Rules, r"\brcdg\b"),
        pattern(DocumentCategory::Specification, r"\bcps\b"),
        pattern(DocumentCategory::Specification, r"\bccaf\b"),
        pattern(DocumentCategory::Addendum, r"\bannexe\b"),
        pattern(DocumentCategory::PriceSchedule, r"\bbpde\b"),
        pattern(DocumentCategory::PriceSchedule, r"\bbordereau[\s_-]*prix\b"),
        pattern(DocumentCategory::PriceSchedule, r"\bbdp\b"),
        pattern(DocumentCategory::CommitmentForm, r"\bae\b"),
        pattern(DocumentCategory::CommitmentForm, r"\bacte[\s_-]*engagement\b"),
        pattern(DocumentCategory::CostBreakdown, r"\bdsh\b"),
        pattern(DocumentCategory::CostBreakdown, r"\bsous[\s_-]*detail\b"),
        pattern(DocumentCategory::CostBreakdown, r"\bdecomposition\b"),
        pattern(DocumentCategory::GeneralAdminClauses, r"\bccag\b"),
        pattern(DocumentCategory::TechnicalClauses, r"\bcctp\b"),
        pattern(DocumentCategory::QuantitySchedule, r"\bbq\b"),
        pattern(DocumentCategory::QuantitySchedule, r"\bbordereau[\s_-]*quantit\b"),
        pattern(DocumentCategory::EstimatedQuantities, r"\bdqe\b"),
        pattern(DocumentCategory::EstimatedQuantities, r"\bdevis[\s_-]*quantitatif\b"),
    ]
});

/// Filenames like `avis rc.pdf` name the notice but ARE the rules document;
/// an AVIS filename hit is skipped when one of these codes is also present.
static AVIS_FILENAME_EXCLUDE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(rc|cps|ccaf|rcdp|rcdg)\b").expect("Invalid filename pattern"));

/// Content keywords checked against the lowercased sample, in order. Only the
/// categories with distinctive boilerplate participate.
const CONTENT_KEYWORDS: &[(DocumentCategory, &[&str])] = &[
    (
        DocumentCategory::PrimaryNotice,
        &[
            "avis de consultation",
            "avis d'appel d'offres",
            "avis d'appel",
            "avis appel offres",
            "avis ao",
            "avis",
        ],
    ),
    (
        DocumentCategory::Rules,
        &[
            "règlement de consultation",
            "reglement de consultation",
            "règlement de la consultation",
            "reglement de la consultation",
        ],
    ),
    (
        DocumentCategory::Specification,
        &[
            "cahier des prescriptions spéciales",
            "cahier des prescriptions speciales",
            "cahier des clauses",
        ],
    ),
    (DocumentCategory::Addendum, &["annexe", "additif", "avenant"]),
];

/// Deterministic category assignment: filename patterns first, then content
/// keywords, falling back to Unknown. Never calls out of process.
pub fn classify_heuristic(text: &str, filename: &str) -> DocumentCategory {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .to_lowercase();

    for fp in FILENAME_PATTERNS.iter() {
        if fp.regex.is_match(&base) {
            if fp.category == DocumentCategory::PrimaryNotice && AVIS_FILENAME_EXCLUDE.is_match(&base) {
                continue;
            }
            return fp.category;
        }
    }

    let text_lower = text.to_lowercase();
    for (category, keywords) in CONTENT_KEYWORDS {
        for keyword in *keywords {
            if text_lower.contains(keyword) {
                return *category;
            }
        }
    }

    DocumentCategory::Unknown
}

/// Optional out-of-process classifier consulted only when the heuristics
/// return Unknown. Implementations receive already-truncated sample text.
pub trait ExternalClassifier: Send + Sync {
    fn classify(&self, sample_text: &str, filename: &str, is_scanned: bool) -> DocumentCategory;
}
