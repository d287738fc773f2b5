//! First-pass classification: bounded sampling plus heuristic category
//! tables, with an optional external classifier as last resort.

pub mod category;
pub mod sampler;

pub use category::{classify_heuristic, DocumentCategory, ExternalClassifier};
pub use sampler::{sample_file, SampleOutcome};

use std::sync::Arc;

use crate::config::{PipelineConfig, DIGITAL_CLASSIFY_CHARS, MIN_EXTERNAL_SAMPLE_CHARS, SCANNED_CLASSIFY_WORDS};
use crate::extraction::legacy_doc::DocConverter;
use crate::extraction::ocr::OcrEngine;
use crate::extraction::{ClassificationRecord, RawFile};

/// One-file classifier: sample, run the heuristics, optionally ask the
/// external classifier when the heuristics come back Unknown.
pub struct Classifier {
    config: PipelineConfig,
    ocr: Arc<dyn OcrEngine>,
    converter: Arc<dyn DocConverter>,
    external: Option<Arc<dyn ExternalClassifier>>,
}

impl Classifier {
    pub fn new(config: PipelineConfig, ocr: Arc<dyn OcrEngine>, converter: Arc<dyn DocConverter>) -> Self {
        Self {
            config,
            ocr,
            converter,
            external: None,
        }
    }

    pub fn with_external(mut self, external: Arc<dyn ExternalClassifier>) -> Self {
        self.external = Some(external);
        self
    }

    pub fn classify(&self, file: &RawFile) -> ClassificationRecord {
        match sampler::sample_file(file, &self.config, self.ocr.as_ref(), self.converter.as_ref()) {
            Ok(sample) => {
                let mut category = category::classify_heuristic(&sample.text, &file.filename);
                if category == DocumentCategory::Unknown {
                    category = self.classify_external(&sample, file);
                }
                tracing::info!(
                    file = %file.filename,
                    category = %category,
                    scanned = sample.is_scanned,
                    "classified"
                );
                ClassificationRecord {
                    filename: file.filename.clone(),
                    sample_text: sample.text,
                    category,
                    is_scanned: sample.is_scanned,
                    mime: file.mime(),
                    size: file.size(),
                    success: true,
                    error: None,
                }
            }
            Err(err) => {
                tracing::warn!(file = %file.filename, error = %err, "classification failed");
                ClassificationRecord {
                    filename: file.filename.clone(),
                    sample_text: String::new(),
                    category: DocumentCategory::Unknown,
                    is_scanned: false,
                    mime: file.mime(),
                    size: file.size(),
                    success: false,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    /// External call gated on a minimum usable sample; stays Unknown when no
    /// classifier is wired or the sample is too thin to mean anything.
    fn classify_external(&self, sample: &SampleOutcome, file: &RawFile) -> DocumentCategory {
        let Some(external) = &self.external else {
            return DocumentCategory::Unknown;
        };
        if sample.text.trim().chars().count() <= MIN_EXTERNAL_SAMPLE_CHARS {
            return DocumentCategory::Unknown;
        }
        let truncated = truncate_for_external(&sample.text, sample.is_scanned);
        external.classify(&truncated, &file.filename, sample.is_scanned)
    }
}

/// OCR text is word-capped (noisy, whitespace-heavy); digital text is
/// char-capped.
fn truncate_for_external(text: &str, is_scanned: bool) -> String {
    if is_scanned {
        text.split_whitespace()
            .take(SCANNED_CLASSIFY_WORDS)
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        text.chars().take(DIGITAL_CLASSIFY_CHARS).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::extraction::ExtractError;

    struct FailingOcr;

    impl OcrEngine for FailingOcr {
        fn ocr_first_page(&self, _: &[u8]) -> Result<String, ExtractError> {
            Err(ExtractError::ConversionFailure("ocr unavailable".to_string()))
        }
        fn ocr_all_pages(&self, _: &[u8]) -> Result<Vec<String>, ExtractError> {
            Err(ExtractError::ConversionFailure("ocr unavailable".to_string()))
        }
    }

    struct FailingConverter;

    impl DocConverter for FailingConverter {
        fn convert(&self, _: &[u8], _: Duration) -> Result<String, ExtractError> {
            Err(ExtractError::ConversionFailure("antiword absent".to_string()))
        }
    }

    struct CountingExternal {
        answer: DocumentCategory,
        calls: AtomicUsize,
    }

    impl CountingExternal {
        fn new(answer: DocumentCategory) -> Self {
            Self {
                answer,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ExternalClassifier for CountingExternal {
        fn classify(&self, _: &str, _: &str, _: bool) -> DocumentCategory {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer
        }
    }

    fn classifier() -> Classifier {
        Classifier::new(PipelineConfig::default(), Arc::new(FailingOcr), Arc::new(FailingConverter))
    }

    #[test]
    fn filename_heuristic_suffices() {
        let external = Arc::new(CountingExternal::new(DocumentCategory::Other));
        let classifier = classifier().with_external(external.clone());
        let file = RawFile::new("rc.txt", b"texte neutre sans marqueur particulier".to_vec());
        let record = classifier.classify(&file);
        assert!(record.success);
        assert_eq!(record.category, DocumentCategory::Rules);
        // Heuristic hit: the external classifier is never consulted.
        assert_eq!(external.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn external_consulted_for_unknown() {
        let external = Arc::new(CountingExternal::new(DocumentCategory::PriceSchedule));
        let classifier = classifier().with_external(external.clone());
        let file = RawFile::new(
            "piece_04.txt",
            b"designation quantite prix unitaire montant total".to_vec(),
        );
        let record = classifier.classify(&file);
        assert_eq!(record.category, DocumentCategory::PriceSchedule);
        assert_eq!(external.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn thin_sample_never_reaches_external() {
        let external = Arc::new(CountingExternal::new(DocumentCategory::Other));
        let classifier = classifier().with_external(external.clone());
        // 20 trimmed chars exactly: at the gate, still excluded.
        let file = RawFile::new("piece_05.txt", b"treize caract. vingt ".to_vec());
        let record = classifier.classify(&file);
        assert_eq!(record.category, DocumentCategory::Unknown);
        assert_eq!(external.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn no_external_stays_unknown() {
        let file = RawFile::new("piece_06.txt", b"contenu sans aucun marqueur connu ici".to_vec());
        let record = classifier().classify(&file);
        assert!(record.success);
        assert_eq!(record.category, DocumentCategory::Unknown);
    }

    #[test]
    fn sampling_failure_marks_record() {
        let file = RawFile::new("photo.png", vec![0x89, 0x50, 0x4e, 0x47]);
        let record = classifier().classify(&file);
        assert!(!record.success);
        assert_eq!(record.category, DocumentCategory::Unknown);
        assert!(record.error.is_some());
        assert!(record.sample_text.is_empty());
    }

    #[test]
    fn scanned_text_word_capped() {
        let text = "mot ".repeat(600);
        let truncated = truncate_for_external(&text, true);
        assert_eq!(truncated.split_whitespace().count(), SCANNED_CLASSIFY_WORDS);
    }

    #[test]
    fn digital_text_char_capped() {
        let text = "x".repeat(3000);
        let truncated = truncate_for_external(&text, false);
        assert_eq!(truncated.chars().count(), DIGITAL_CLASSIFY_CHARS);
    }
}
