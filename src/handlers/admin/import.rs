use axum::{body::Bytes, extract::State};
use serde::Deserialize;

use crate::db::AppState;
use crate::error::{AppError, Result};
use crate::extractors::{Json, Query};
use crate::import::{self, ImportReport};

#[derive(Debug, Deserialize)]
pub struct ImportQuery {
    /// Original file name; its extension selects the reader.
    pub file_name: String,
    #[serde(default)]
    pub dry_run: bool,
}

/// Import coupons from a spreadsheet sent as the raw request body.
pub async fn import_spreadsheet(
    State(state): State<AppState>,
    Query(query): Query<ImportQuery>,
    body: Bytes,
) -> Result<Json<ImportReport>> {
    if body.is_empty() {
        return Err(AppError::BadRequest("Request body is empty".into()));
    }

    let rows = import::extract_rows(&query.file_name, &body)?;
    let report = import::import_coupons(state.store.as_ref(), &rows, query.dry_run)?;
    Ok(Json(report))
}
