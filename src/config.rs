//! Pipeline configuration and the contractual heuristic constants.
//!
//! The thresholds below are empirically chosen and treated as contract:
//! tests pin their exact values, and downstream behavior (scanned detection,
//! multi-tender rejection, sampling bounds) is defined in terms of them.

use std::time::Duration;

/// First-page trimmed character count below which a PDF counts as scanned.
pub const SCANNED_TEXT_THRESHOLD: usize = 100;

/// More than this many reference-number-shaped matches flags a notice as a
/// multi-tender compilation.
pub const MULTI_TENDER_REF_LIMIT: usize = 3;

/// DOCX sampling stops once this many paragraph characters are collected.
pub const DOCX_SAMPLE_CHARS: usize = 1000;

/// Workbook sampling stops after this many non-blank rows of the first sheet.
pub const XLSX_SAMPLE_ROWS: usize = 20;

/// Plain-text sampling reads at most this many bytes.
pub const TXT_SAMPLE_BYTES: usize = 2000;

/// Legacy-DOC samples (converted or recovered) are capped to this many chars.
pub const DOC_SAMPLE_CHARS: usize = 1000;

/// Printable-run recovery acceptance floors, sampling vs. full extraction.
pub const DOC_RECOVERY_SAMPLE_FLOOR: usize = 50;
pub const DOC_RECOVERY_FULL_FLOOR: usize = 100;

/// Extracted text shorter than this (trimmed) is not worth a fragment call.
pub const MIN_FRAGMENT_TEXT_CHARS: usize = 50;

/// Per-document truncation when assembling the deep-analysis context.
pub const CONTEXT_DOC_CHARS: usize = 8000;

/// External-classifier input caps: word-capped for OCR text, char-capped
/// for digital text.
pub const SCANNED_CLASSIFY_WORDS: usize = 500;
pub const DIGITAL_CLASSIFY_CHARS: usize = 2000;

/// The external classifier is only consulted above this trimmed sample length.
pub const MIN_EXTERNAL_SAMPLE_CHARS: usize = 20;

/// A sample counts as Arabic only when its Arabic-script character count
/// exceeds both this floor and the Latin-script count.
pub const ARABIC_SCRIPT_FLOOR: usize = 50;

/// Default `tracing` filter when RUST_LOG is unset.
pub fn default_log_filter() -> &'static str {
    "info,tendermill=debug"
}

/// Runtime knobs for the extraction tools.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Tesseract language pack chain.
    pub ocr_lang: String,
    /// Render resolution for pdftoppm.
    pub ocr_dpi: u32,
    pub pdftoppm_bin: String,
    pub tesseract_bin: String,
    pub antiword_bin: String,
    /// Wall-clock deadline for antiword during sampling.
    pub doc_sample_timeout: Duration,
    /// Wall-clock deadline for antiword during full extraction.
    pub doc_full_timeout: Duration,
    /// Blocking-slot count for the extraction pool.
    pub extraction_workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ocr_lang: "fra+ara+eng".to_string(),
            ocr_dpi: 200,
            pdftoppm_bin: "pdftoppm".to_string(),
            tesseract_bin: "tesseract".to_string(),
            antiword_bin: "antiword".to_string(),
            doc_sample_timeout: Duration::from_secs(30),
            doc_full_timeout: Duration::from_secs(60),
            extraction_workers: default_workers(),
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by any TENDERMILL_* environment variables present.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(lang) = env_string("TENDERMILL_OCR_LANG") {
            config.ocr_lang = lang;
        }
        if let Some(dpi) = env_parse::<u32>("TENDERMILL_OCR_DPI") {
            config.ocr_dpi = dpi;
        }
        if let Some(bin) = env_string("TENDERMILL_PDFTOPPM") {
            config.pdftoppm_bin = bin;
        }
        if let Some(bin) = env_string("TENDERMILL_TESSERACT") {
            config.tesseract_bin = bin;
        }
        if let Some(bin) = env_string("TENDERMILL_ANTIWORD") {
            config.antiword_bin = bin;
        }
        if let Some(secs) = env_parse::<u64>("TENDERMILL_DOC_SAMPLE_TIMEOUT_SECS") {
            config.doc_sample_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_parse::<u64>("TENDERMILL_DOC_FULL_TIMEOUT_SECS") {
            config.doc_full_timeout = Duration::from_secs(secs);
        }
        if let Some(workers) = env_parse::<usize>("TENDERMILL_EXTRACTION_WORKERS") {
            config.extraction_workers = workers.max(1);
        }
        config
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.trim().parse().ok())
}
