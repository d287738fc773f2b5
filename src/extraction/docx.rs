//! DOCX text via the OOXML container: body paragraphs in order, then table
//! rows flattened to pipe-joined cells.

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;

use super::ExtractError;

/// Paragraphs and table rows pulled from `word/document.xml`.
#[derive(Debug, Default)]
pub struct DocxText {
    pub paragraphs: Vec<String>,
    /// One entry per row, cells joined with " | ".
    pub table_rows: Vec<String>,
}

impl DocxText {
    /// Body paragraphs first, then table rows, newline-joined.
    pub fn full_text(&self) -> String {
        let mut lines: Vec<&str> = self.paragraphs.iter().map(String::as_str).collect();
        lines.extend(self.table_rows.iter().map(String::as_str));
        lines.join("\n")
    }

    /// Leading paragraphs until the running character count exceeds the
    /// budget; the crossing paragraph is kept whole.
    pub fn sample(&self, max_chars: usize) -> String {
        let mut parts: Vec<&str> = Vec::new();
        let mut count = 0usize;
        for paragraph in &self.paragraphs {
            parts.push(paragraph.as_str());
            count += paragraph.chars().count();
            if count > max_chars {
                break;
            }
        }
        parts.join("\n")
    }
}

/// Unpack the archive and parse `word/document.xml`.
pub fn extract_docx(docx_bytes: &[u8]) -> Result<DocxText, ExtractError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(docx_bytes))
        .map_err(|e| ExtractError::ParseFailure(e.to_string()))?;
    let mut document_xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractError::ParseFailure(format!("word/document.xml: {e}")))?
        .read_to_string(&mut document_xml)?;
    parse_document_xml(&document_xml)
}

/// Single pass over the WordprocessingML stream. Text lives in w:t runs;
/// table depth decides whether a paragraph belongs to the body or to a cell.
fn parse_document_xml(xml: &str) -> Result<DocxText, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut out = DocxText::default();

    let mut table_depth = 0usize;
    let mut in_text_run = false;
    let mut paragraph = String::new();
    let mut cell = String::new();
    let mut row: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:tbl" => table_depth += 1,
                b"w:tr" => row.clear(),
                b"w:tc" => cell.clear(),
                b"w:p" if table_depth == 0 => paragraph.clear(),
                b"w:t" => in_text_run = true,
                _ => {}
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:tbl" => table_depth = table_depth.saturating_sub(1),
                b"w:tr" if table_depth > 0 => out.table_rows.push(row.join(" | ")),
                b"w:tc" if table_depth > 0 => row.push(cell.trim().to_string()),
                b"w:t" => in_text_run = false,
                b"w:p" => {
                    if table_depth == 0 {
                        out.paragraphs.push(paragraph.clone());
                    } else if !cell.is_empty() {
                        cell.push(' ');
                    }
                }
                _ => {}
            },
            // Self-closing paragraphs are blank lines.
            Ok(Event::Empty(e)) if e.name().as_ref() == b"w:p" && table_depth == 0 => {
                out.paragraphs.push(String::new());
            }
            Ok(Event::Text(t)) if in_text_run => {
                let text = t
                    .unescape()
                    .map_err(|e| ExtractError::ParseFailure(e.to_string()))?;
                if table_depth == 0 {
                    paragraph.push_str(&text);
                } else {
                    cell.push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(ExtractError::ParseFailure(e.to_string())),
        }
    }

    Ok(out)
}
