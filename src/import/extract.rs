use std::io::Cursor;
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto_from_rs};

use crate::error::ImportError;

use super::CellValue;

const PREFERRED_SHEET: &str = "Sheet1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Delimited(u8),
    Workbook,
}

fn file_kind(file_name: &str) -> Result<FileKind, ImportError> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "csv" | "txt" => Ok(FileKind::Delimited(b',')),
        "tsv" => Ok(FileKind::Delimited(b'\t')),
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(FileKind::Workbook),
        _ => Err(ImportError::UnsupportedFileType(file_name.to_string())),
    }
}

/// Read every row of an uploaded spreadsheet. The format is chosen by file extension.
pub fn extract_rows(file_name: &str, bytes: &[u8]) -> Result<Vec<Vec<CellValue>>, ImportError> {
    let rows = match file_kind(file_name)? {
        FileKind::Delimited(delimiter) => read_delimited(bytes, delimiter)?,
        FileKind::Workbook => read_workbook(bytes)?,
    };

    if rows.is_empty() {
        return Err(ImportError::EmptyFile);
    }
    tracing::debug!("Extracted {} rows from {}", rows.len(), file_name);
    Ok(rows)
}

fn read_delimited(bytes: &[u8], delimiter: u8) -> Result<Vec<Vec<CellValue>>, ImportError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(CellValue::from_text).collect());
    }
    Ok(rows)
}

fn read_workbook(bytes: &[u8]) -> Result<Vec<Vec<CellValue>>, ImportError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

    let names = workbook.sheet_names();
    let sheet = names
        .iter()
        .find(|name| name.as_str() == PREFERRED_SHEET)
        .or_else(|| names.first())
        .cloned()
        .ok_or(ImportError::NoSheet)?;

    let range = workbook.worksheet_range(&sheet)?;
    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect())
}

fn cell_from_data(data: &Data) -> CellValue {
    match data {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::from_text(s),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
    }
}
