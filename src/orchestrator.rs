//! The two-phase pipeline driver.
//!
//! Phase 1 is lazy: classify every file cheaply, then walk the candidate
//! waterfall (notice, rules, specification) extracting full text only while
//! the accumulated record still misses required fields. Phase 2 ignores
//! completeness and extracts every context-bearing category for deep
//! analysis. Neither phase performs network I/O; the AI fragment call and
//! the optional external classifier are injected traits.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use crate::classify::{Classifier, DocumentCategory, ExternalClassifier};
use crate::concurrency::CancelToken;
use crate::config::{PipelineConfig, MIN_FRAGMENT_TEXT_CHARS};
use crate::extraction::{
    Antiword, ClassificationRecord, DocConverter, ExtractionEngine, ExtractionRecord, OcrEngine,
    RawFile, TesseractCli, ToolCheck,
};
use crate::metadata::{
    build_analysis_context, is_complete, merge_metadata, missing_fields, normalize_fragment,
    FragmentExtractor, FragmentSource, MetadataRecord,
};
use crate::selection::{is_multi_tender_compilation, select_best};

/// Phase-1 extraction order paired with the fragment label for each source.
const LAZY_WATERFALL: [(DocumentCategory, FragmentSource); 3] = [
    (DocumentCategory::PrimaryNotice, FragmentSource::PrimaryNotice),
    (DocumentCategory::Rules, FragmentSource::Rules),
    (DocumentCategory::Specification, FragmentSource::Specification),
];

/// Phase-2 extraction order, matching the context priority.
const ASSEMBLE_ORDER: [DocumentCategory; 4] = [
    DocumentCategory::Addendum,
    DocumentCategory::Specification,
    DocumentCategory::Rules,
    DocumentCategory::PrimaryNotice,
];

/// One tender's in-memory document bundle, as handed over by the scraping
/// layer. File order is preserved and breaks selection ties.
#[derive(Debug, Clone)]
pub struct TenderBundle {
    pub files: Vec<RawFile>,
    /// Expected reference for this tender; guard log context only.
    pub tender_reference: Option<String>,
}

impl TenderBundle {
    pub fn new(files: Vec<RawFile>) -> Self {
        Self {
            files,
            tender_reference: None,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.tender_reference = Some(reference.into());
        self
    }

    fn file(&self, filename: &str) -> Option<&RawFile> {
        self.files.iter().find(|f| f.filename == filename)
    }
}

/// Which source satisfied the Phase-1 required fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase1Source {
    /// The incoming record was already complete; nothing was extracted.
    AlreadyComplete,
    /// The primary notice completed the record.
    Primary,
    /// A fallback category completed the record.
    Fallback(DocumentCategory),
    /// The waterfall ended with the record still incomplete.
    Exhausted,
}

/// Everything a lazy Phase-1 run produced.
#[derive(Debug)]
pub struct LazyOutcome {
    pub run_id: Uuid,
    pub metadata: Option<MetadataRecord>,
    /// One record per category actually extracted, failures included.
    pub extractions: BTreeMap<DocumentCategory, ExtractionRecord>,
    /// All classification records, sample text already purged.
    pub classifications: Vec<ClassificationRecord>,
    pub source: Phase1Source,
}

/// Everything an assemble-all Phase-2 run produced.
#[derive(Debug)]
pub struct AssembleOutcome {
    pub run_id: Uuid,
    pub extractions: BTreeMap<DocumentCategory, ExtractionRecord>,
    pub classifications: Vec<ClassificationRecord>,
}

impl AssembleOutcome {
    /// Concatenated per-document context for the deep analysis call.
    pub fn analysis_context(&self) -> String {
        build_analysis_context(&self.extractions)
    }
}

/// Pipeline over one tender bundle. Holds no per-run state; a single
/// instance serves any number of sequential runs.
pub struct TenderPipeline {
    classifier: Classifier,
    engine: ExtractionEngine,
    fragments: Arc<dyn FragmentExtractor>,
}

impl TenderPipeline {
    pub fn new(
        config: PipelineConfig,
        ocr: Arc<dyn OcrEngine>,
        converter: Arc<dyn DocConverter>,
        fragments: Arc<dyn FragmentExtractor>,
    ) -> Self {
        Self {
            classifier: Classifier::new(config.clone(), Arc::clone(&ocr), Arc::clone(&converter)),
            engine: ExtractionEngine::new(config, ocr, converter),
            fragments,
        }
    }

    /// Wire the real subprocess tools (pdftoppm, tesseract, antiword),
    /// logging which of them are actually installed.
    pub fn with_default_tools(config: PipelineConfig, fragments: Arc<dyn FragmentExtractor>) -> Self {
        ToolCheck::probe(&config).log();
        let ocr: Arc<dyn OcrEngine> = Arc::new(TesseractCli::new(&config));
        let converter: Arc<dyn DocConverter> = Arc::new(Antiword::new(config.antiword_bin.clone()));
        Self::new(config, ocr, converter, fragments)
    }

    pub fn with_external_classifier(mut self, external: Arc<dyn ExternalClassifier>) -> Self {
        self.classifier = self.classifier.with_external(external);
        self
    }

    /// Lazy Phase-1 run: stop extracting as soon as the accumulated record
    /// (starting from `initial`, typically the website fragment) has every
    /// required field.
    pub fn run_lazy(
        &self,
        bundle: &TenderBundle,
        initial: Option<MetadataRecord>,
        cancel: &CancelToken,
    ) -> LazyOutcome {
        let run_id = Uuid::new_v4();
        let span = info_span!("phase1_lazy", run = %run_id);
        let _guard = span.enter();

        let mut classifications = self.classify_bundle(bundle, cancel);
        let mut extractions: BTreeMap<DocumentCategory, ExtractionRecord> = BTreeMap::new();
        let mut metadata = initial;
        let mut source = Phase1Source::Exhausted;

        if is_complete(metadata.as_ref()) {
            info!("record already complete, skipping extraction");
            source = Phase1Source::AlreadyComplete;
        } else {
            for (category, label) in LAZY_WATERFALL {
                if cancel.is_cancelled() {
                    warn!("run cancelled, stopping waterfall");
                    break;
                }
                let Some(candidate) = self.best_candidate(&classifications, category, bundle) else {
                    debug!(category = %category, "no usable candidate");
                    continue;
                };
                let Some(file) = bundle.file(&candidate.filename) else {
                    continue;
                };
                let is_scanned = candidate.is_scanned;
                info!(category = %category, file = %file.filename, "extracting candidate");

                let mut record = self.engine.extract_full(file, is_scanned);
                // The slot a record fills is decided by selection, not by the
                // full-text refinement.
                record.category = category;
                let fragment = if record.success {
                    self.fragment_for(&record, label)
                } else {
                    None
                };
                extractions.insert(category, record);
                if let Some(fragment) = fragment {
                    metadata = merge_metadata(metadata, Some(fragment));
                }

                if is_complete(metadata.as_ref()) {
                    source = if category == DocumentCategory::PrimaryNotice {
                        Phase1Source::Primary
                    } else {
                        Phase1Source::Fallback(category)
                    };
                    info!(category = %category, "required fields complete");
                    break;
                }
            }
        }

        for record in &mut classifications {
            record.purge_sample();
        }
        info!(
            source = ?source,
            extracted = extractions.len(),
            missing = ?missing_fields(metadata.as_ref()),
            "phase 1 finished"
        );
        LazyOutcome {
            run_id,
            metadata,
            extractions,
            classifications,
            source,
        }
    }

    /// Phase-2 run: extract every context category present, regardless of
    /// record completeness.
    pub fn run_assemble_all(&self, bundle: &TenderBundle, cancel: &CancelToken) -> AssembleOutcome {
        let run_id = Uuid::new_v4();
        let span = info_span!("phase2_assemble", run = %run_id);
        let _guard = span.enter();

        let mut classifications = self.classify_bundle(bundle, cancel);
        let mut extractions: BTreeMap<DocumentCategory, ExtractionRecord> = BTreeMap::new();
        for category in ASSEMBLE_ORDER {
            if cancel.is_cancelled() {
                warn!("run cancelled, stopping assembly");
                break;
            }
            let Some(candidate) = self.best_candidate(&classifications, category, bundle) else {
                continue;
            };
            let Some(file) = bundle.file(&candidate.filename) else {
                continue;
            };
            info!(category = %category, file = %file.filename, "extracting for context");
            let mut record = self.engine.extract_full(file, candidate.is_scanned);
            record.category = category;
            extractions.insert(category, record);
        }

        for record in &mut classifications {
            record.purge_sample();
        }
        info!(extracted = extractions.len(), "phase 2 assembly finished");
        AssembleOutcome {
            run_id,
            extractions,
            classifications,
        }
    }

    fn classify_bundle(&self, bundle: &TenderBundle, cancel: &CancelToken) -> Vec<ClassificationRecord> {
        let mut records = Vec::new();
        for file in &bundle.files {
            if cancel.is_cancelled() {
                warn!("run cancelled, stopping classification");
                break;
            }
            if file.is_hidden_or_temp() {
                debug!(file = %file.filename, "skipping hidden or temp file");
                continue;
            }
            records.push(self.classifier.classify(file));
        }
        records
    }

    /// Best classified candidate for a category, with the compilation guard
    /// applied to primary notices. A flagged notice leaves its slot empty.
    fn best_candidate<'a>(
        &self,
        classifications: &'a [ClassificationRecord],
        category: DocumentCategory,
        bundle: &TenderBundle,
    ) -> Option<&'a ClassificationRecord> {
        let candidates: Vec<&ClassificationRecord> = classifications
            .iter()
            .filter(|r| r.success && r.category == category)
            .collect();
        let chosen = select_best(&candidates)?;
        if category == DocumentCategory::PrimaryNotice
            && is_multi_tender_compilation(&chosen.sample_text, bundle.tender_reference.as_deref())
        {
            return None;
        }
        Some(chosen)
    }

    /// Run the fragment call over usable text and normalize the answer.
    /// Text under the minimum is never sent out.
    fn fragment_for(&self, record: &ExtractionRecord, label: FragmentSource) -> Option<MetadataRecord> {
        let text = record.full_text.trim();
        if text.chars().count() < MIN_FRAGMENT_TEXT_CHARS {
            debug!(file = %record.filename, "text too short for a fragment call");
            return None;
        }
        let raw = self.fragments.extract_fragment(text, label)?;
        Some(normalize_fragment(raw, label.metadata_source(), None))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use serde_json::{json, Value};

    use crate::extraction::ExtractError;
    use crate::metadata::{MetadataSource, SubmissionDeadline, TrackedValue};

    use super::*;

    struct NoopOcr;

    impl OcrEngine for NoopOcr {
        fn ocr_first_page(&self, _: &[u8]) -> Result<String, ExtractError> {
            Err(ExtractError::ConversionFailure("no ocr in tests".to_string()))
        }
        fn ocr_all_pages(&self, _: &[u8]) -> Result<Vec<String>, ExtractError> {
            Err(ExtractError::ConversionFailure("no ocr in tests".to_string()))
        }
    }

    struct NoopConverter;

    impl DocConverter for NoopConverter {
        fn convert(&self, _: &[u8], _: Duration) -> Result<String, ExtractError> {
            Err(ExtractError::ConversionFailure("no antiword in tests".to_string()))
        }
    }

    /// Canned fragment answers keyed by source code, remembering each call.
    struct MockFragments {
        responses: HashMap<&'static str, Value>,
        calls: Mutex<Vec<FragmentSource>>,
    }

    impl MockFragments {
        fn new(responses: &[(&'static str, Value)]) -> Self {
            Self {
                responses: responses.iter().cloned().collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<FragmentSource> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl FragmentExtractor for MockFragments {
        fn extract_fragment(&self, _: &str, source: FragmentSource) -> Option<Value> {
            self.calls.lock().unwrap().push(source);
            self.responses.get(source.as_code()).cloned()
        }
    }

    fn make_pipeline(fragments: Arc<MockFragments>) -> TenderPipeline {
        TenderPipeline::new(
            PipelineConfig::default(),
            Arc::new(NoopOcr),
            Arc::new(NoopConverter),
            fragments,
        )
    }

    fn avis_text() -> &'static str {
        "Avis d'appel d'offres ouvert n° 45/2024. Objet: travaux d'amenagement de la \
         voirie communale. La seance d'ouverture des plis se tiendra au siege de la commune."
    }

    fn rc_text() -> &'static str {
        "Reglement de consultation du marche. Les pieces du dossier administratif sont \
         listees a l'article 4. Le soumissionnaire doit deposer son offre avant la date limite."
    }

    fn cps_text() -> &'static str {
        "Cahier des prescriptions speciales. Article premier: le present marche a pour \
         objet les travaux d'amenagement. Les obligations du titulaire sont definies ci-dessous."
    }

    fn tender_bundle() -> TenderBundle {
        TenderBundle::new(vec![
            RawFile::new("avis 2024.txt", avis_text().as_bytes().to_vec()),
            RawFile::new("rc 2024.txt", rc_text().as_bytes().to_vec()),
            RawFile::new("cps 2024.txt", cps_text().as_bytes().to_vec()),
        ])
    }

    fn tracked(value: &str, source: MetadataSource) -> TrackedValue {
        TrackedValue::new(json!(value), source)
    }

    fn complete_record() -> MetadataRecord {
        let source = MetadataSource::Website;
        MetadataRecord {
            reference_tender: Some(tracked("45/2024", source)),
            subject: Some(tracked("Travaux de voirie", source)),
            issuing_institution: Some(tracked("Commune de Rabat", source)),
            submission_deadline: Some(SubmissionDeadline {
                date: Some(tracked("2024-06-30", source)),
                time: None,
            }),
            ..Default::default()
        }
    }

    fn complete_fragment() -> Value {
        json!({
            "reference_tender": "45/2024",
            "subject": "Travaux d'amenagement de la voirie",
            "issuing_institution": "Commune de Rabat",
            "submission_deadline": {"date": "2024-06-30", "time": "10:00"}
        })
    }

    // ==============================================
    // Lazy waterfall
    // ==============================================

    #[test]
    fn complete_input_skips_extraction() {
        let fragments = Arc::new(MockFragments::new(&[]));
        let pipeline = make_pipeline(Arc::clone(&fragments));

        let outcome = pipeline.run_lazy(&tender_bundle(), Some(complete_record()), &CancelToken::new());

        assert_eq!(outcome.source, Phase1Source::AlreadyComplete);
        assert!(outcome.extractions.is_empty());
        assert!(fragments.calls().is_empty());
        assert_eq!(outcome.classifications.len(), 3);
    }

    #[test]
    fn primary_notice_completes_record() {
        let fragments = Arc::new(MockFragments::new(&[("AVIS", complete_fragment())]));
        let pipeline = make_pipeline(Arc::clone(&fragments));

        let outcome = pipeline.run_lazy(&tender_bundle(), None, &CancelToken::new());

        assert_eq!(outcome.source, Phase1Source::Primary);
        assert_eq!(outcome.extractions.len(), 1);
        assert!(outcome.extractions.contains_key(&DocumentCategory::PrimaryNotice));
        assert_eq!(fragments.calls(), vec![FragmentSource::PrimaryNotice]);

        let metadata = outcome.metadata.unwrap();
        assert_eq!(
            metadata.reference_tender.unwrap().source_document,
            MetadataSource::Document(DocumentCategory::PrimaryNotice)
        );
    }

    #[test]
    fn fallback_category_completes_record() {
        let fragments = Arc::new(MockFragments::new(&[
            ("AVIS", json!({"reference_tender": "45/2024", "subject": "Travaux de voirie"})),
            (
                "RC",
                json!({
                    "issuing_institution": "Commune de Rabat",
                    "submission_deadline": {"date": "2024-06-30"}
                }),
            ),
        ]));
        let pipeline = make_pipeline(Arc::clone(&fragments));

        let outcome = pipeline.run_lazy(&tender_bundle(), None, &CancelToken::new());

        assert_eq!(outcome.source, Phase1Source::Fallback(DocumentCategory::Rules));
        assert_eq!(outcome.extractions.len(), 2);
        assert_eq!(outcome.extractions[&DocumentCategory::Rules].category, DocumentCategory::Rules);
        assert_eq!(
            fragments.calls(),
            vec![FragmentSource::PrimaryNotice, FragmentSource::Rules]
        );

        // Provenance: each field names the document that supplied it.
        let metadata = outcome.metadata.unwrap();
        assert_eq!(
            metadata.subject.unwrap().source_document,
            MetadataSource::Document(DocumentCategory::PrimaryNotice)
        );
        assert_eq!(
            metadata.issuing_institution.unwrap().source_document,
            MetadataSource::Document(DocumentCategory::Rules)
        );
    }

    #[test]
    fn exhausted_waterfall_extracts_everything() {
        let fragments = Arc::new(MockFragments::new(&[]));
        let pipeline = make_pipeline(Arc::clone(&fragments));

        let outcome = pipeline.run_lazy(&tender_bundle(), None, &CancelToken::new());

        assert_eq!(outcome.source, Phase1Source::Exhausted);
        assert_eq!(outcome.extractions.len(), 3);
        assert!(!is_complete(outcome.metadata.as_ref()));
        assert_eq!(
            fragments.calls(),
            vec![
                FragmentSource::PrimaryNotice,
                FragmentSource::Rules,
                FragmentSource::Specification
            ]
        );
    }

    #[test]
    fn website_values_survive_document_fragments() {
        let initial = MetadataRecord {
            reference_tender: Some(tracked("45/2024", MetadataSource::Website)),
            ..Default::default()
        };
        let fragments = Arc::new(MockFragments::new(&[(
            "AVIS",
            json!({
                "reference_tender": "99/2024",
                "subject": "Travaux de voirie",
                "issuing_institution": "Commune de Rabat",
                "submission_deadline": {"date": "2024-06-30"}
            }),
        )]));
        let pipeline = make_pipeline(Arc::clone(&fragments));

        let outcome = pipeline.run_lazy(&tender_bundle(), Some(initial), &CancelToken::new());

        assert_eq!(outcome.source, Phase1Source::Primary);
        let reference = outcome.metadata.unwrap().reference_tender.unwrap();
        assert_eq!(reference.value, Some(json!("45/2024")));
        assert_eq!(reference.source_document, MetadataSource::Website);
    }

    #[test]
    fn compilation_notice_excluded_from_waterfall() {
        let multi_avis = "Avis: les marches prevus pour 2024. n° 10/2024 n° 11/2024 \
                          n° 12/2024 n° 13/2024 concernant diverses communes du royaume.";
        let bundle = TenderBundle::new(vec![
            RawFile::new("avis liste.txt", multi_avis.as_bytes().to_vec()),
            RawFile::new("rc 2024.txt", rc_text().as_bytes().to_vec()),
        ]);
        let fragments = Arc::new(MockFragments::new(&[("RC", complete_fragment())]));
        let pipeline = make_pipeline(Arc::clone(&fragments));

        let outcome = pipeline.run_lazy(&bundle, None, &CancelToken::new());

        assert_eq!(outcome.source, Phase1Source::Fallback(DocumentCategory::Rules));
        assert!(!outcome.extractions.contains_key(&DocumentCategory::PrimaryNotice));
        assert_eq!(fragments.calls(), vec![FragmentSource::Rules]);
    }

    #[test]
    fn short_text_skips_fragment_but_keeps_extraction() {
        let bundle = TenderBundle::new(vec![RawFile::new("avis.txt", b"Avis tres court.".to_vec())]);
        let fragments = Arc::new(MockFragments::new(&[("AVIS", complete_fragment())]));
        let pipeline = make_pipeline(Arc::clone(&fragments));

        let outcome = pipeline.run_lazy(&bundle, None, &CancelToken::new());

        assert!(fragments.calls().is_empty());
        assert_eq!(outcome.source, Phase1Source::Exhausted);
        assert!(outcome.extractions.contains_key(&DocumentCategory::PrimaryNotice));
    }

    // ==============================================
    // Bundle walk
    // ==============================================

    #[test]
    fn hidden_and_temp_files_not_classified() {
        let bundle = TenderBundle::new(vec![
            RawFile::new("~$avis.txt", b"temporaire".to_vec()),
            RawFile::new(".DS_Store", vec![0u8; 8]),
            RawFile::new("avis 2024.txt", avis_text().as_bytes().to_vec()),
        ]);
        let pipeline = make_pipeline(Arc::new(MockFragments::new(&[])));

        let outcome = pipeline.run_lazy(&bundle, Some(complete_record()), &CancelToken::new());

        assert_eq!(outcome.classifications.len(), 1);
        assert_eq!(outcome.classifications[0].filename, "avis 2024.txt");
    }

    #[test]
    fn samples_purged_after_run() {
        let pipeline = make_pipeline(Arc::new(MockFragments::new(&[])));
        let outcome = pipeline.run_lazy(&tender_bundle(), None, &CancelToken::new());

        assert!(!outcome.classifications.is_empty());
        assert!(outcome.classifications.iter().all(|c| c.sample_text.is_empty()));
    }

    #[test]
    fn cancelled_run_does_nothing() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let pipeline = make_pipeline(Arc::new(MockFragments::new(&[])));

        let outcome = pipeline.run_lazy(&tender_bundle(), None, &cancel);

        assert!(outcome.classifications.is_empty());
        assert!(outcome.extractions.is_empty());
        assert_eq!(outcome.source, Phase1Source::Exhausted);
    }

    // ==============================================
    // Assemble-all
    // ==============================================

    #[test]
    fn assemble_all_extracts_every_context_category() {
        let annexe_text = "Annexe n° 1 au reglement. Le present additif modifie la date \
                           limite de remise des offres et complete le bordereau.";
        let mut files = tender_bundle().files;
        files.push(RawFile::new("annexe 1.txt", annexe_text.as_bytes().to_vec()));
        let bundle = TenderBundle::new(files);
        let pipeline = make_pipeline(Arc::new(MockFragments::new(&[])));

        let outcome = pipeline.run_assemble_all(&bundle, &CancelToken::new());

        assert_eq!(outcome.extractions.len(), 4);
        let context = outcome.analysis_context();
        let annexe = context.find("=== ANNEXE:").unwrap();
        let cps = context.find("=== CPS:").unwrap();
        let avis = context.find("=== AVIS:").unwrap();
        assert!(annexe < cps && cps < avis);
        assert!(outcome.classifications.iter().all(|c| c.sample_text.is_empty()));
    }

    #[test]
    fn assemble_all_ignores_completeness() {
        // No fragments are ever requested in assemble mode.
        let fragments = Arc::new(MockFragments::new(&[("AVIS", complete_fragment())]));
        let pipeline = make_pipeline(Arc::clone(&fragments));

        let outcome = pipeline.run_assemble_all(&tender_bundle(), &CancelToken::new());

        assert_eq!(outcome.extractions.len(), 3);
        assert!(fragments.calls().is_empty());
    }
}
