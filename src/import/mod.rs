//! Bulk import: spreadsheet extraction, row normalization and duplicate planning.

mod extract;
mod normalize;

pub use extract::extract_rows;
pub use normalize::normalize_rows;

use std::collections::HashSet;

use serde::Serialize;

use crate::error::ImportError;
use crate::models::{Coupon, NewCoupon};
use crate::store::CouponStore;

/// A single spreadsheet cell as read from the file.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
}

impl CellValue {
    /// Blank strings become [`CellValue::Empty`].
    pub fn from_text(s: &str) -> Self {
        if s.trim().is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s.to_string())
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            CellValue::Number(n) => n.to_string(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::from_text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

#[derive(Debug, Default)]
pub struct ImportPlan {
    pub fresh: Vec<NewCoupon>,
    pub duplicates: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub parsed: usize,
    pub duplicates: usize,
    pub inserted: usize,
    pub dry_run: bool,
}

/// Split records into those to insert and those whose code already exists,
/// either in the store or earlier in the same file. Records to insert start unused.
pub fn plan_import(records: Vec<NewCoupon>, existing: &[Coupon]) -> ImportPlan {
    let mut seen: HashSet<String> = existing.iter().map(|c| c.code.to_uppercase()).collect();
    let mut plan = ImportPlan::default();

    for record in records {
        if seen.insert(record.code.to_uppercase()) {
            plan.fresh.push(record.into_unused());
        } else {
            plan.duplicates += 1;
        }
    }
    plan
}

/// Normalize `rows`, drop duplicates and write the rest in batches.
pub fn import_coupons<S: CouponStore + ?Sized>(
    store: &S,
    rows: &[Vec<CellValue>],
    dry_run: bool,
) -> Result<ImportReport, ImportError> {
    let records = normalize_rows(rows)?;
    let parsed = records.len();

    let existing = store.fetch_all()?;
    let plan = plan_import(records, &existing);

    let inserted = if dry_run || plan.fresh.is_empty() {
        0
    } else {
        store.create_many(&plan.fresh)?
    };

    tracing::info!(
        "Import parsed {} rows: {} duplicates, {} inserted{}",
        parsed,
        plan.duplicates,
        inserted,
        if dry_run { " (dry run)" } else { "" }
    );

    Ok(ImportReport {
        parsed,
        duplicates: plan.duplicates,
        inserted,
        dry_run,
    })
}
