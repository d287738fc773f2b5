//! Per-format dispatch for full extraction, the digital/OCR split and the
//! post-extraction category refinement.

use std::sync::Arc;

use crate::classify::category::{classify_heuristic, DocumentCategory};
use crate::config::PipelineConfig;

use super::legacy_doc::{recover_printable_text, DocConverter, RecoveryMode, DOC_FAILURE_SENTINEL};
use super::ocr::OcrEngine;
use super::types::{ExtractionMethod, ExtractionRecord, RawFile};
use super::{docx, pdf, xlsx, ExtractError};

/// Full-text extraction over every supported format. OCR and DOC conversion
/// are injected so tests can run without the external binaries.
pub struct ExtractionEngine {
    config: PipelineConfig,
    ocr: Arc<dyn OcrEngine>,
    converter: Arc<dyn DocConverter>,
}

impl ExtractionEngine {
    pub fn new(config: PipelineConfig, ocr: Arc<dyn OcrEngine>, converter: Arc<dyn DocConverter>) -> Self {
        Self { config, ocr, converter }
    }

    /// Extract one file fully. Failures are file-scoped: the returned record
    /// carries success=false and never aborts sibling files. Sentinel texts
    /// (OCR, DOC, workbook) count as successes; the text says what happened.
    pub fn extract_full(&self, file: &RawFile, is_scanned: bool) -> ExtractionRecord {
        match self.extract_inner(file, is_scanned) {
            Ok((full_text, page_count, method)) => {
                // Re-run the heuristics with the full text; a file the sample
                // left Unknown often declares itself on a later page.
                let category = classify_heuristic(&full_text, &file.filename);
                ExtractionRecord {
                    filename: file.filename.clone(),
                    category,
                    full_text,
                    page_count,
                    method,
                    size: file.size(),
                    mime: file.mime(),
                    success: true,
                    error: None,
                }
            }
            Err(err) => {
                tracing::warn!(file = %file.filename, error = %err, "extraction failed");
                ExtractionRecord {
                    filename: file.filename.clone(),
                    category: DocumentCategory::Unknown,
                    full_text: String::new(),
                    page_count: None,
                    method: ExtractionMethod::Digital,
                    size: file.size(),
                    mime: file.mime(),
                    success: false,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    fn extract_inner(
        &self,
        file: &RawFile,
        is_scanned: bool,
    ) -> Result<(String, Option<usize>, ExtractionMethod), ExtractError> {
        let ext = file.extension().unwrap_or_default();
        match ext.as_str() {
            "pdf" if is_scanned => Ok(self.extract_pdf_ocr(&file.bytes)),
            "pdf" => {
                let (text, pages) = pdf::extract_digital(&file.bytes)?;
                Ok((text, Some(pages), ExtractionMethod::Digital))
            }
            "docx" => {
                let text = docx::extract_docx(&file.bytes)?.full_text();
                Ok((text, None, ExtractionMethod::Digital))
            }
            "doc" => Ok((self.extract_legacy_doc(&file.bytes), None, ExtractionMethod::Digital)),
            "xlsx" | "xls" => {
                let text = match xlsx::extract_workbook(&file.bytes) {
                    Ok(text) => text,
                    Err(err) => format!("[EXCEL EXTRACTION FAILED: {err}]"),
                };
                Ok((text, None, ExtractionMethod::Digital))
            }
            "txt" => Ok((
                String::from_utf8_lossy(&file.bytes).into_owned(),
                None,
                ExtractionMethod::Digital,
            )),
            other => Err(ExtractError::UnsupportedFormat(other.to_string())),
        }
    }

    /// OCR every page into `--- Page N ---` blocks. A failed OCR run yields
    /// the sentinel text with a zero page count rather than an error.
    fn extract_pdf_ocr(&self, bytes: &[u8]) -> (String, Option<usize>, ExtractionMethod) {
        match self.ocr.ocr_all_pages(bytes) {
            Ok(pages) => {
                let blocks: Vec<String> = pages
                    .iter()
                    .enumerate()
                    .map(|(i, text)| format!("--- Page {} ---\n{text}", i + 1))
                    .collect();
                let page_count = pages.len();
                (
                    blocks.join("\n\n").trim().to_string(),
                    Some(page_count),
                    ExtractionMethod::Ocr,
                )
            }
            Err(err) => {
                tracing::warn!(error = %err, "full ocr failed");
                (format!("[OCR FAILED: {err}]"), Some(0), ExtractionMethod::Ocr)
            }
        }
    }

    fn extract_legacy_doc(&self, bytes: &[u8]) -> String {
        match self.converter.convert(bytes, self.config.doc_full_timeout) {
            Ok(text) => text,
            Err(err) => {
                tracing::debug!(error = %err, "doc conversion failed, trying printable recovery");
                recover_printable_text(bytes, RecoveryMode::Full)
                    .unwrap_or_else(|| DOC_FAILURE_SENTINEL.to_string())
            }
        }
    }
}
