//! Assembles the multi-document analysis context for the deep Phase-2 pass.

use std::collections::BTreeMap;

use crate::classify::category::DocumentCategory;
use crate::config::CONTEXT_DOC_CHARS;
use crate::extraction::ExtractionRecord;

/// Categories whose text leads the context, most authoritative last-word
/// documents first. Everything else follows in category order.
const CONTEXT_PRIORITY: [DocumentCategory; 4] = [
    DocumentCategory::Addendum,
    DocumentCategory::Specification,
    DocumentCategory::Rules,
    DocumentCategory::PrimaryNotice,
];

/// Concatenate per-document blocks, each capped at [`CONTEXT_DOC_CHARS`]
/// characters and headed by a category marker:
///
/// ```text
/// === AVIS: avis_2024.pdf ===
/// <text>
/// ```
///
/// Failed or empty extractions contribute nothing.
pub fn build_analysis_context(extractions: &BTreeMap<DocumentCategory, ExtractionRecord>) -> String {
    let mut blocks: Vec<String> = Vec::new();
    for category in CONTEXT_PRIORITY {
        if let Some(record) = extractions.get(&category) {
            push_block(&mut blocks, category, record);
        }
    }
    for (category, record) in extractions {
        if !CONTEXT_PRIORITY.contains(category) {
            push_block(&mut blocks, *category, record);
        }
    }
    blocks.join("\n\n")
}

fn push_block(blocks: &mut Vec<String>, category: DocumentCategory, record: &ExtractionRecord) {
    if !record.success || record.full_text.trim().is_empty() {
        return;
    }
    let text: String = record.full_text.chars().take(CONTEXT_DOC_CHARS).collect();
    blocks.push(format!("=== {}: {} ===\n{}", category.as_code(), record.filename, text));
}
