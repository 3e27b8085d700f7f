use crate::dates::{self, DateInput};
use crate::error::ImportError;
use crate::models::NewCoupon;
use crate::util::normalize_code;

use super::CellValue;

const HEADER_KEYWORDS: &[&str] = &[
    "code",
    "type",
    "validfrom",
    "validto",
    "valid_from",
    "valid_to",
    "from",
    "to",
];

const CODE_COL: usize = 0;
const TYPE_COL: usize = 1;
const VALID_FROM_COL: usize = 2;
const VALID_TO_COL: usize = 3;

fn is_header(row: &[CellValue]) -> bool {
    row.iter().any(|cell| {
        let text = cell.to_text().trim().to_lowercase();
        HEADER_KEYWORDS.contains(&text.as_str())
    })
}

fn cell(row: &[CellValue], index: usize) -> Option<&CellValue> {
    row.get(index).filter(|c| !c.is_blank())
}

/// Canonical `dd/mm/yyyy` when the cell reads as a date, the trimmed text otherwise.
fn normalize_date_cell(value: &CellValue) -> String {
    let parsed = match value {
        CellValue::Number(n) => dates::parse_flexible_date(DateInput::Serial(*n)),
        other => dates::parse_flexible_date(other.to_text().trim()),
    };
    match parsed {
        Ok(date) => dates::format_canonical(date),
        Err(_) => value.to_text().trim().to_string(),
    }
}

/// Turn extracted spreadsheet rows into coupon records.
///
/// Columns are positional: code, type, valid from, valid to. A first row that
/// contains a known column name is treated as a header. Rows missing a code or
/// either date are skipped.
pub fn normalize_rows(rows: &[Vec<CellValue>]) -> Result<Vec<NewCoupon>, ImportError> {
    let start = match rows.first() {
        Some(first) if is_header(first) => 1,
        _ => 0,
    };

    let coupons: Vec<NewCoupon> = rows
        .iter()
        .skip(start)
        .filter_map(|row| {
            let code = normalize_code(&cell(row, CODE_COL)?.to_text());
            if code.is_empty() {
                return None;
            }
            let valid_from = cell(row, VALID_FROM_COL)?;
            let valid_to = cell(row, VALID_TO_COL)?;
            let kind = cell(row, TYPE_COL)
                .map(|c| c.to_text().trim().to_string())
                .unwrap_or_default();

            Some(NewCoupon {
                code,
                kind: Some(kind),
                used: false,
                used_by: String::new(),
                used_date: String::new(),
                note: String::new(),
                valid_from: normalize_date_cell(valid_from),
                valid_to: normalize_date_cell(valid_to),
            })
        })
        .collect();

    if coupons.is_empty() {
        return Err(ImportError::EmptyFile);
    }
    Ok(coupons)
}
