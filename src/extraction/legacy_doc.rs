//! Legacy .doc extraction: antiword when available, printable-run recovery
//! straight from the file bytes when it is not.

use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use regex::Regex;

use crate::config::{DOC_RECOVERY_FULL_FLOOR, DOC_RECOVERY_SAMPLE_FLOOR, DOC_SAMPLE_CHARS};

use super::ExtractError;

/// Stored verbatim when both antiword and recovery come up empty.
pub const DOC_FAILURE_SENTINEL: &str =
    "[.DOC EXTRACTION FAILED - File may be corrupted or in unsupported format]";

/// Legacy-DOC conversion boundary; the subprocess implementation is swapped
/// out in tests.
pub trait DocConverter: Send + Sync {
    /// Convert .doc bytes to plain text within the wall-clock deadline.
    fn convert(&self, doc_bytes: &[u8], timeout: Duration) -> Result<String, ExtractError>;
}

/// Runs the antiword binary against a staged temp file.
pub struct Antiword {
    binary: String,
}

impl Antiword {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl DocConverter for Antiword {
    fn convert(&self, doc_bytes: &[u8], timeout: Duration) -> Result<String, ExtractError> {
        which::which(&self.binary)
            .map_err(|_| ExtractError::ConversionFailure(format!("{} not found on PATH", self.binary)))?;

        let mut staged = tempfile::Builder::new().suffix(".doc").tempfile()?;
        staged.write_all(doc_bytes)?;
        staged.flush()?;

        let mut child = Command::new(&self.binary)
            .arg(staged.path())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        // Drain stdout on its own thread so a large document never deadlocks
        // the poll loop on a full pipe.
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExtractError::ConversionFailure("child stdout unavailable".to_string()))?;
        let reader = std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stdout.read_to_end(&mut buf);
            buf
        });

        let deadline = Instant::now() + timeout;
        let status = loop {
            match child.try_wait()? {
                Some(status) => break status,
                None if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ExtractError::ConversionFailure(format!(
                        "{} timed out after {:.0?}",
                        self.binary, timeout
                    )));
                }
                None => std::thread::sleep(Duration::from_millis(50)),
            }
        };

        let raw = reader.join().unwrap_or_default();
        if !status.success() {
            return Err(ExtractError::ConversionFailure(format!(
                "{} exited with {status}",
                self.binary
            )));
        }
        let text = String::from_utf8_lossy(&raw).into_owned();
        if text.trim().is_empty() {
            return Err(ExtractError::ConversionFailure(format!(
                "{} produced no text",
                self.binary
            )));
        }
        Ok(text)
    }
}

/// Character classes and acceptance floors differ between sampling and full
/// extraction: samples want letters only, full output keeps digits and
/// basic punctuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryMode {
    Sample,
    Full,
}

static SAMPLE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-ZÀ-ÿ\s]{4,}").expect("Invalid recovery pattern"));
static FULL_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-ZÀ-ÿ0-9\s\.,;:\-\(\)]{4,}").expect("Invalid recovery pattern"));
static WHITESPACE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid recovery pattern"));

/// Pull readable runs out of .doc byte soup, trying UTF-8 then Windows-1252.
/// Returns None when no decoding clears the acceptance floor for the mode.
pub fn recover_printable_text(doc_bytes: &[u8], mode: RecoveryMode) -> Option<String> {
    let (runs, floor) = match mode {
        RecoveryMode::Sample => (&*SAMPLE_RUNS, DOC_RECOVERY_SAMPLE_FLOOR),
        RecoveryMode::Full => (&*FULL_RUNS, DOC_RECOVERY_FULL_FLOOR),
    };

    let utf8 = String::from_utf8_lossy(doc_bytes).into_owned();
    let (cp1252, _, _) = encoding_rs::WINDOWS_1252.decode(doc_bytes);

    for decoded in [utf8.as_str(), cp1252.as_ref()] {
        let words: Vec<&str> = runs.find_iter(decoded).map(|m| m.as_str()).collect();
        if words.is_empty() {
            continue;
        }
        let joined = words.join(" ");
        let cleaned = WHITESPACE_RUNS.replace_all(&joined, " ").trim().to_string();
        if cleaned.chars().count() > floor {
            return Some(match mode {
                RecoveryMode::Sample => cleaned.chars().take(DOC_SAMPLE_CHARS).collect(),
                RecoveryMode::Full => cleaned,
            });
        }
    }
    None
}
