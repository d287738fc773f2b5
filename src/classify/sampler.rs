//! Bounded per-format sampling: first PDF page, leading DOCX paragraphs,
//! first workbook rows, a short TXT prefix. Samples exist only to feed
//! classification and selection, never persistence.

use crate::config::{PipelineConfig, DOCX_SAMPLE_CHARS, DOC_SAMPLE_CHARS, TXT_SAMPLE_BYTES, XLSX_SAMPLE_ROWS};
use crate::extraction::legacy_doc::{recover_printable_text, DocConverter, RecoveryMode};
use crate::extraction::ocr::OcrEngine;
use crate::extraction::{docx, pdf, xlsx, ExtractError, RawFile};

/// Sample text plus the scanned flag (meaningful for PDFs only).
#[derive(Debug, Default)]
pub struct SampleOutcome {
    pub text: String,
    pub is_scanned: bool,
}

/// Cheap first-pass read of one file. Per-format degradation: parse problems
/// inside a supported format give an empty sample, only an unsupported
/// extension is an error.
pub fn sample_file(
    file: &RawFile,
    config: &PipelineConfig,
    ocr: &dyn OcrEngine,
    converter: &dyn DocConverter,
) -> Result<SampleOutcome, ExtractError> {
    let ext = file.extension().unwrap_or_default();
    match ext.as_str() {
        "pdf" => Ok(sample_pdf(file, ocr)),
        "docx" => Ok(SampleOutcome {
            text: sample_docx(file),
            is_scanned: false,
        }),
        "doc" => Ok(SampleOutcome {
            text: sample_doc(file, config, converter),
            is_scanned: false,
        }),
        "xlsx" | "xls" => Ok(SampleOutcome {
            text: sample_workbook(file),
            is_scanned: false,
        }),
        "txt" => {
            let end = file.bytes.len().min(TXT_SAMPLE_BYTES);
            Ok(SampleOutcome {
                text: String::from_utf8_lossy(&file.bytes[..end]).into_owned(),
                is_scanned: false,
            })
        }
        other => Err(ExtractError::UnsupportedFormat(other.to_string())),
    }
}

/// First-page probe, with a one-page OCR rescue only when the page carried no
/// digital text at all. Short-but-present digital text is kept as-is.
fn sample_pdf(file: &RawFile, ocr: &dyn OcrEngine) -> SampleOutcome {
    let probe = match pdf::probe_first_page(&file.bytes) {
        Ok(probe) => probe,
        Err(err) => {
            tracing::warn!(file = %file.filename, error = %err, "pdf probe failed, treating as scanned");
            return SampleOutcome {
                text: String::new(),
                is_scanned: true,
            };
        }
    };

    if probe.is_scanned && probe.text.is_empty() {
        tracing::info!(file = %file.filename, "image-only first page, running ocr");
        match ocr.ocr_first_page(&file.bytes) {
            Ok(text) => {
                return SampleOutcome {
                    text,
                    is_scanned: true,
                }
            }
            Err(err) => {
                tracing::warn!(file = %file.filename, error = %err, "first-page ocr failed");
                return SampleOutcome {
                    text: String::new(),
                    is_scanned: true,
                };
            }
        }
    }

    SampleOutcome {
        text: probe.text,
        is_scanned: probe.is_scanned,
    }
}

fn sample_docx(file: &RawFile) -> String {
    match docx::extract_docx(&file.bytes) {
        Ok(parsed) => parsed.sample(DOCX_SAMPLE_CHARS),
        Err(err) => {
            tracing::warn!(file = %file.filename, error = %err, "docx sampling failed");
            String::new()
        }
    }
}

fn sample_doc(file: &RawFile, config: &PipelineConfig, converter: &dyn DocConverter) -> String {
    match converter.convert(&file.bytes, config.doc_sample_timeout) {
        Ok(text) => text.chars().take(DOC_SAMPLE_CHARS).collect(),
        Err(err) => {
            tracing::debug!(file = %file.filename, error = %err, "doc conversion failed, trying printable recovery");
            recover_printable_text(&file.bytes, RecoveryMode::Sample).unwrap_or_default()
        }
    }
}

fn sample_workbook(file: &RawFile) -> String {
    match xlsx::sample_rows(&file.bytes, XLSX_SAMPLE_ROWS) {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(file = %file.filename, error = %err, "workbook sampling failed");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    const LONG_PAGE: &str = "REGLEMENT DE CONSULTATION relatif au marche de travaux \
        d amenagement des voiries communales, passe en application des textes en \
        vigueur regissant la passation des marches publics au Maroc.";

    struct FixedOcr(&'static str);

    impl OcrEngine for FixedOcr {
        fn ocr_first_page(&self, _: &[u8]) -> Result<String, ExtractError> {
            Ok(self.0.to_string())
        }
        fn ocr_all_pages(&self, _: &[u8]) -> Result<Vec<String>, ExtractError> {
            Ok(vec![self.0.to_string()])
        }
    }

    struct FailingOcr;

    impl OcrEngine for FailingOcr {
        fn ocr_first_page(&self, _: &[u8]) -> Result<String, ExtractError> {
            Err(ExtractError::ConversionFailure("ocr unavailable".to_string()))
        }
        fn ocr_all_pages(&self, _: &[u8]) -> Result<Vec<String>, ExtractError> {
            Err(ExtractError::ConversionFailure("ocr unavailable".to_string()))
        }
    }

    struct FixedConverter(Result<String, ()>);

    impl DocConverter for FixedConverter {
        fn convert(&self, _: &[u8], _: Duration) -> Result<String, ExtractError> {
            match &self.0 {
                Ok(text) => Ok(text.clone()),
                Err(()) => Err(ExtractError::ConversionFailure("antiword absent".to_string())),
            }
        }
    }

    fn sample(file: &RawFile, ocr: &dyn OcrEngine, converter: &dyn DocConverter) -> SampleOutcome {
        sample_file(file, &PipelineConfig::default(), ocr, converter).unwrap()
    }

    #[test]
    fn digital_pdf_skips_ocr() {
        let file = RawFile::new("rc.pdf", pdf::make_test_pdf(&[LONG_PAGE]));
        // FailingOcr proves the OCR engine is never consulted.
        let outcome = sample(&file, &FailingOcr, &FixedConverter(Err(())));
        assert!(!outcome.is_scanned);
        assert!(outcome.text.contains("REGLEMENT DE CONSULTATION"));
    }

    #[test]
    fn short_digital_text_kept_without_ocr() {
        let file = RawFile::new("garde.pdf", pdf::make_test_pdf(&["Page de garde"]));
        let outcome = sample(&file, &FailingOcr, &FixedConverter(Err(())));
        assert!(outcome.is_scanned);
        assert!(outcome.text.contains("Page de garde"));
    }

    #[test]
    fn unreadable_pdf_goes_through_ocr() {
        let file = RawFile::new("scan.pdf", b"not a pdf".to_vec());
        let outcome = sample(&file, &FixedOcr("AVIS DE CONSULTATION scanne"), &FixedConverter(Err(())));
        assert!(outcome.is_scanned);
        assert_eq!(outcome.text, "AVIS DE CONSULTATION scanne");
    }

    #[test]
    fn failed_ocr_leaves_empty_scanned_sample() {
        let file = RawFile::new("scan.pdf", b"not a pdf".to_vec());
        let outcome = sample(&file, &FailingOcr, &FixedConverter(Err(())));
        assert!(outcome.is_scanned);
        assert!(outcome.text.is_empty());
    }

    #[test]
    fn txt_sample_truncated_to_byte_budget() {
        let file = RawFile::new("notes.txt", vec![b'x'; 3000]);
        let outcome = sample(&file, &FailingOcr, &FixedConverter(Err(())));
        assert_eq!(outcome.text.len(), TXT_SAMPLE_BYTES);
        assert!(!outcome.is_scanned);
    }

    #[test]
    fn txt_sample_tolerates_invalid_utf8() {
        let file = RawFile::new("notes.txt", vec![b'a', 0xff, 0xfe, b'b']);
        let outcome = sample(&file, &FailingOcr, &FixedConverter(Err(())));
        assert!(outcome.text.starts_with('a'));
        assert!(outcome.text.ends_with('b'));
    }

    #[test]
    fn doc_sample_capped() {
        let long = "Reglement de consultation ".repeat(100);
        let file = RawFile::new("rc.doc", vec![0xd0, 0xcf]);
        let outcome = sample(&file, &FailingOcr, &FixedConverter(Ok(long)));
        assert_eq!(outcome.text.chars().count(), DOC_SAMPLE_CHARS);
    }

    #[test]
    fn doc_sample_recovers_when_conversion_fails() {
        let mut bytes = vec![0u8, 1, 2];
        bytes.extend_from_slice(b"cahier des prescriptions speciales pour le marche communal");
        let file = RawFile::new("cps.doc", bytes);
        let outcome = sample(&file, &FailingOcr, &FixedConverter(Err(())));
        assert!(outcome.text.contains("cahier des prescriptions"));
    }

    #[test]
    fn doc_sample_empty_when_unrecoverable() {
        let file = RawFile::new("vide.doc", vec![0u8, 1, 2, 3]);
        let outcome = sample(&file, &FailingOcr, &FixedConverter(Err(())));
        assert!(outcome.text.is_empty());
    }

    #[test]
    fn unsupported_extension_is_an_error() {
        let file = RawFile::new("image.png", vec![0x89, 0x50]);
        let result = sample_file(
            &file,
            &PipelineConfig::default(),
            &FailingOcr,
            &FixedConverter(Err(())),
        );
        assert!(result.is_err());
    }
}
