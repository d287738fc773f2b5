//! PDF text paths: a cheap first-page probe for classification and the full
//! per-page digital extraction.

use lopdf::Document;

use super::ExtractError;
use crate::config::SCANNED_TEXT_THRESHOLD;

/// First-page probe used for scanned detection and sampling.
#[derive(Debug)]
pub struct FirstPageProbe {
    /// Raw first-page text; may be empty for image-only pages.
    pub text: String,
    pub is_scanned: bool,
    pub page_count: usize,
}

/// Scanned iff the trimmed first-page text stays under the threshold.
fn sample_is_scanned(first_page_text: &str) -> bool {
    first_page_text.trim().chars().count() < SCANNED_TEXT_THRESHOLD
}

/// Read page 1 only. A PDF with no pages is scanned with an empty sample;
/// a page that fails to extract reads as empty and the threshold catches it.
pub fn probe_first_page(pdf_bytes: &[u8]) -> Result<FirstPageProbe, ExtractError> {
    let doc = Document::load_mem(pdf_bytes).map_err(|e| ExtractError::ParseFailure(e.to_string()))?;
    let pages = doc.get_pages();
    if pages.is_empty() {
        return Ok(FirstPageProbe {
            text: String::new(),
            is_scanned: true,
            page_count: 0,
        });
    }
    let text = doc.extract_text(&[1]).unwrap_or_default();
    let is_scanned = sample_is_scanned(&text);
    Ok(FirstPageProbe {
        text,
        is_scanned,
        page_count: pages.len(),
    })
}

/// Full digital extraction: per-page text joined with blank lines, plus the
/// page count.
pub fn extract_digital(pdf_bytes: &[u8]) -> Result<(String, usize), ExtractError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
        .map_err(|e| ExtractError::ParseFailure(e.to_string()))?;
    let page_count = pages.len();
    Ok((pages.join("\n\n"), page_count))
}

/// Minimal one-font PDF builder shared by extraction tests.
#[cfg(test)]
pub(crate) fn make_test_pdf(page_texts: &[&str]) -> Vec<u8> {
    use lopdf::{dictionary, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in page_texts {
        let content = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("failed to serialize test PDF");
    bytes
}
