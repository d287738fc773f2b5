//! Tender-bundle processing: cheap first-pass classification, lazy
//! full-text extraction and provenance-tracked metadata fusion for
//! public procurement document sets.

pub mod classify; // sampling + heuristic category tables
pub mod concurrency;
pub mod config;
pub mod extraction; // per-format full text, OCR, legacy DOC
pub mod logging;
pub mod metadata; // tracked record, completeness oracle, fusion
pub mod orchestrator;
pub mod selection; // language preference + compilation guard

pub use classify::{Classifier, DocumentCategory, ExternalClassifier};
pub use concurrency::{CancelToken, ExtractionPool, PoolError};
pub use config::PipelineConfig;
pub use extraction::{ClassificationRecord, ExtractError, ExtractionMethod, ExtractionRecord, RawFile};
pub use metadata::{
    build_analysis_context, is_complete, merge_metadata, missing_fields, normalize_fragment,
    FragmentExtractor, FragmentSource, KeywordBuckets, Lot, MetadataRecord, MetadataSource,
    RequiredField, SubmissionDeadline, TrackedValue,
};
pub use orchestrator::{AssembleOutcome, LazyOutcome, Phase1Source, TenderBundle, TenderPipeline};
pub use selection::{detect_language, is_multi_tender_compilation, select_best, DetectedLanguage};
