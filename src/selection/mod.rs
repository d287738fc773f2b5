//! Best-candidate selection among the classified files of one category.

pub mod guard;
pub mod language;

pub use guard::is_multi_tender_compilation;
pub use language::{detect_language, DetectedLanguage};

use tracing::debug;

use crate::extraction::ClassificationRecord;

/// Pick the single representative for a category: French versions first,
/// language-neutral files next, Arabic-only versions last. Within a tier
/// the input order decides, so callers get a stable choice.
pub fn select_best<'a>(candidates: &[&'a ClassificationRecord]) -> Option<&'a ClassificationRecord> {
    let mut french: Vec<&ClassificationRecord> = Vec::new();
    let mut neutral: Vec<&ClassificationRecord> = Vec::new();
    let mut arabic: Vec<&ClassificationRecord> = Vec::new();
    for &record in candidates {
        match detect_language(&record.sample_text, &record.filename) {
            DetectedLanguage::French => french.push(record),
            DetectedLanguage::Neutral => neutral.push(record),
            DetectedLanguage::Arabic => arabic.push(record),
        }
    }

    let chosen = french
        .first()
        .or_else(|| neutral.first())
        .or_else(|| arabic.first())
        .copied();
    if let Some(record) = chosen {
        debug!(
            filename = %record.filename,
            french = french.len(),
            neutral = neutral.len(),
            arabic = arabic.len(),
            "Candidate selected"
        );
    }
    chosen
}
