//! Shared record types flowing between classification, selection and extraction.

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::classify::category::DocumentCategory;

/// One file of a tender bundle, held in memory for the duration of a run.
#[derive(Debug, Clone)]
pub struct RawFile {
    /// Path as supplied by the caller; may contain directory components.
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl RawFile {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    /// Final path component, accepting both separator styles.
    pub fn basename(&self) -> &str {
        self.filename
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.filename.as_str())
    }

    /// Lowercased extension without the dot, if any.
    pub fn extension(&self) -> Option<String> {
        let (_, ext) = self.basename().rsplit_once('.')?;
        if ext.is_empty() {
            None
        } else {
            Some(ext.to_ascii_lowercase())
        }
    }

    /// MIME type guessed from the filename; unknown maps to octet-stream.
    pub fn mime(&self) -> String {
        mime_guess::from_path(&self.filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Hidden files and editor temp files are excluded from the bundle walk.
    pub fn is_hidden_or_temp(&self) -> bool {
        let base = self.basename();
        base.starts_with('.') || base.starts_with("~$") || base.starts_with("__")
    }
}

/// How full text was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    Digital,
    Ocr,
}

/// First-pass result for one file: the assigned category plus the ephemeral
/// sample that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationRecord {
    pub filename: String,
    /// First page / first rows only. Purged after selection, never serialized.
    #[serde(skip)]
    pub sample_text: String,
    pub category: DocumentCategory,
    pub is_scanned: bool,
    pub mime: String,
    pub size: u64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ClassificationRecord {
    /// Zero and drop the sample once selection no longer needs it.
    pub fn purge_sample(&mut self) {
        self.sample_text.zeroize();
    }
}

/// Full-text extraction result for one selected document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub filename: String,
    pub category: DocumentCategory,
    pub full_text: String,
    /// PDF only; OCR failure stores Some(0), other formats None.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,
    pub method: ExtractionMethod,
    pub size: u64,
    pub mime: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
