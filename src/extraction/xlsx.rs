//! Workbook text extraction: calamine's structured XLSX reader first, the
//! auto-detecting reader as fallback (which also covers legacy .xls), each
//! sheet rendered under a named marker.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader, Xlsx};

use super::ExtractError;

/// `=== Sheet: name ===` blocks with pipe-joined non-blank rows.
pub fn extract_workbook(bytes: &[u8]) -> Result<String, ExtractError> {
    match read_structured(bytes) {
        Ok(text) => Ok(text),
        Err(primary) => {
            tracing::debug!(error = %primary, "structured workbook read failed, trying auto-detection");
            read_auto(bytes).map_err(|fallback| {
                ExtractError::ParseFailure(format!("{primary}; fallback: {fallback}"))
            })
        }
    }
}

/// First non-blank rows of the first sheet, pipe-joined, for classification.
pub fn sample_rows(bytes: &[u8], max_rows: usize) -> Result<String, ExtractError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| ExtractError::ParseFailure(e.to_string()))?;
    let names = workbook.sheet_names().to_vec();
    let Some(first) = names.first() else {
        return Ok(String::new());
    };
    let range = workbook
        .worksheet_range(first)
        .map_err(|e| ExtractError::ParseFailure(e.to_string()))?;

    let mut lines = Vec::new();
    for row in range.rows() {
        let cells: Vec<String> = row.iter().map(cell_to_string).collect();
        if cells.iter().any(|c| !c.is_empty()) {
            lines.push(cells.join(" | "));
            if lines.len() > max_rows {
                break;
            }
        }
    }
    Ok(lines.join("\n"))
}

fn read_structured(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes)).map_err(|e| ExtractError::ParseFailure(e.to_string()))?;
    let mut sections = Vec::new();
    for name in workbook.sheet_names().to_vec() {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| ExtractError::ParseFailure(e.to_string()))?;
        sections.push(format!("=== Sheet: {name} ==="));
        for row in range.rows() {
            let cells: Vec<String> = row.iter().map(cell_to_string).collect();
            if cells.iter().any(|c| !c.is_empty()) {
                sections.push(cells.join(" | "));
            }
        }
    }
    Ok(sections.join("\n"))
}

fn read_auto(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| ExtractError::ParseFailure(e.to_string()))?;
    let mut sections = Vec::new();
    for name in workbook.sheet_names().to_vec() {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| ExtractError::ParseFailure(e.to_string()))?;
        sections.push(format!("=== Sheet: {name} ==="));
        sections.push(render_text_table(&range));
    }
    Ok(sections.join("\n"))
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

/// Column-aligned plain-text rendering used by the fallback reader.
fn render_text_table(range: &Range<Data>) -> String {
    let rows: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0usize; columns];
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }
    rows.iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(i, cell)| format!("{cell:<width$}", width = widths[i]))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}
