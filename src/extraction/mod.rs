//! Full-text extraction for the formats tender bundles actually contain:
//! PDF (digital or OCR), DOCX, legacy DOC, XLSX/XLS and plain text.

pub mod docx;
pub mod engine;
pub mod legacy_doc;
pub mod ocr;
pub mod pdf;
pub mod types;
pub mod xlsx;

pub use engine::*;
pub use legacy_doc::{Antiword, DocConverter};
pub use ocr::{OcrEngine, TesseractCli, ToolCheck};
pub use types::*;

use thiserror::Error;

/// Extraction failures. File-scoped: one bad file never aborts its siblings.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Conversion failed: {0}")]
    ConversionFailure(String),

    #[error("Parsing failed: {0}")]
    ParseFailure(String),
}
