//! OCR path for scanned PDFs: pdftoppm renders pages to PNG, tesseract reads
//! them back as text. Both are external binaries resolved from PATH.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::PipelineConfig;

use super::ExtractError;

/// OCR engine boundary; the subprocess implementation is swapped out in tests.
pub trait OcrEngine: Send + Sync {
    /// OCR page 1 only, trimmed; used for classification samples.
    fn ocr_first_page(&self, pdf_bytes: &[u8]) -> Result<String, ExtractError>;

    /// OCR every page, one string per page, in page order.
    fn ocr_all_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractError>;
}

/// Subprocess-backed engine shelling out to pdftoppm and tesseract.
pub struct TesseractCli {
    pdftoppm: String,
    tesseract: String,
    lang: String,
    dpi: u32,
}

impl TesseractCli {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            pdftoppm: config.pdftoppm_bin.clone(),
            tesseract: config.tesseract_bin.clone(),
            lang: config.ocr_lang.clone(),
            dpi: config.ocr_dpi,
        }
    }

    fn require_tools(&self) -> Result<(), ExtractError> {
        for bin in [&self.pdftoppm, &self.tesseract] {
            which::which(bin)
                .map_err(|_| ExtractError::ConversionFailure(format!("{bin} not found on PATH")))?;
        }
        Ok(())
    }

    /// Render pages to PNG under `dir`. pdftoppm pads page numbers to a
    /// uniform width, so the lexicographic sort is also the page order.
    fn render_pages(
        &self,
        pdf_bytes: &[u8],
        first_page_only: bool,
        dir: &Path,
    ) -> Result<Vec<PathBuf>, ExtractError> {
        let pdf_path = dir.join("input.pdf");
        std::fs::write(&pdf_path, pdf_bytes)?;

        let mut cmd = Command::new(&self.pdftoppm);
        cmd.arg("-r").arg(self.dpi.to_string()).arg("-png");
        if first_page_only {
            cmd.arg("-f").arg("1").arg("-l").arg("1");
        }
        cmd.arg(&pdf_path).arg(dir.join("page"));

        let output = cmd.output()?;
        if !output.status.success() {
            return Err(ExtractError::ConversionFailure(format!(
                "pdftoppm exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let mut images: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "png"))
            .collect();
        images.sort();
        if images.is_empty() {
            return Err(ExtractError::ConversionFailure("no pages rendered".to_string()));
        }
        Ok(images)
    }

    fn ocr_image(&self, image: &Path) -> Result<String, ExtractError> {
        let output = Command::new(&self.tesseract)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.lang)
            .arg("--oem")
            .arg("3")
            .arg("--psm")
            .arg("3")
            .output()?;
        if !output.status.success() {
            return Err(ExtractError::ConversionFailure(format!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl OcrEngine for TesseractCli {
    fn ocr_first_page(&self, pdf_bytes: &[u8]) -> Result<String, ExtractError> {
        self.require_tools()?;
        let dir = tempfile::tempdir()?;
        let images = self.render_pages(pdf_bytes, true, dir.path())?;
        let first = images
            .first()
            .ok_or_else(|| ExtractError::ConversionFailure("no pages rendered".to_string()))?;
        Ok(self.ocr_image(first)?.trim().to_string())
    }

    fn ocr_all_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
        self.require_tools()?;
        let dir = tempfile::tempdir()?;
        let images = self.render_pages(pdf_bytes, false, dir.path())?;
        let mut pages = Vec::with_capacity(images.len());
        for (index, image) in images.iter().enumerate() {
            tracing::debug!(page = index + 1, total = images.len(), "running ocr");
            pages.push(self.ocr_image(image)?);
        }
        Ok(pages)
    }
}

/// Availability of the external binaries, probed once at pipeline wiring.
#[derive(Debug, Clone)]
pub struct ToolCheck {
    pub pdftoppm: bool,
    pub tesseract: bool,
    pub antiword: bool,
}

impl ToolCheck {
    pub fn probe(config: &PipelineConfig) -> Self {
        Self {
            pdftoppm: which::which(&config.pdftoppm_bin).is_ok(),
            tesseract: which::which(&config.tesseract_bin).is_ok(),
            antiword: which::which(&config.antiword_bin).is_ok(),
        }
    }

    pub fn ocr_available(&self) -> bool {
        self.pdftoppm && self.tesseract
    }

    pub fn log(&self) {
        if self.ocr_available() {
            tracing::info!("ocr tools found: pdftoppm + tesseract");
        } else {
            tracing::warn!(
                pdftoppm = self.pdftoppm,
                tesseract = self.tesseract,
                "ocr tools missing, scanned pdfs will fail extraction"
            );
        }
        if !self.antiword {
            tracing::warn!("antiword not found, .doc files fall back to printable-text recovery");
        }
    }
}
