use axum::{extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::dates;
use crate::db::AppState;
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path, Query};
use crate::models::{Coupon, CouponUpdate, NewCoupon, SortDirection, SortField};
use crate::stats::{filter_by_code, sort_coupons};
use crate::util::normalize_code;

/// Phrase required by the delete-all endpoint.
pub const DELETE_ALL_CONFIRMATION: &str = "DELETE ALL";

#[derive(Debug, Default, Deserialize)]
pub struct ListCouponsQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub sort: Option<SortField>,
    #[serde(default)]
    pub direction: SortDirection,
}

#[derive(Debug, Deserialize)]
pub struct DeleteAllQuery {
    #[serde(default)]
    pub confirm: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeletedCount {
    pub deleted: usize,
}

/// Canonical `dd/mm/yyyy` form of an admin-entered date (either `dd/mm/yyyy` or
/// the `yyyy-mm-dd` of a date input).
fn canonical_date(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    let date = dates::parse_flexible_date(value)?;
    Ok(dates::format_canonical(date))
}

fn ensure_code_free(state: &AppState, code: &str, except_id: Option<&str>) -> Result<()> {
    match state.store.fetch_by_code(code)? {
        Some(existing) if Some(existing.id.as_str()) != except_id => Err(AppError::Conflict(
            format!("A coupon with code {code} already exists"),
        )),
        _ => Ok(()),
    }
}

pub async fn list_coupons(
    State(state): State<AppState>,
    Query(query): Query<ListCouponsQuery>,
) -> Result<Json<Vec<Coupon>>> {
    let coupons = state.store.fetch_all()?;
    let mut view = filter_by_code(&coupons, query.search.as_deref().unwrap_or_default());
    if let Some(field) = query.sort {
        sort_coupons(&mut view, field, query.direction);
    }
    Ok(Json(view.into_iter().cloned().collect()))
}

pub async fn create_coupon(
    State(state): State<AppState>,
    Json(mut input): Json<NewCoupon>,
) -> Result<(StatusCode, Json<Coupon>)> {
    input.code = normalize_code(&input.code);
    if input.code.is_empty() {
        return Err(AppError::BadRequest("code is required".into()));
    }
    input.valid_from = canonical_date("valid_from", &input.valid_from)?;
    input.valid_to = canonical_date("valid_to", &input.valid_to)?;

    ensure_code_free(&state, &input.code, None)?;

    let id = state.store.create(&input)?;
    let coupon = state
        .store
        .fetch_by_id(&id)?
        .ok_or_else(|| AppError::Internal("Created coupon could not be read back".into()))?;

    tracing::info!("Created coupon {}", coupon.code);
    Ok((StatusCode::CREATED, Json(coupon)))
}

pub async fn get_coupon(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Coupon>> {
    let coupon = state
        .store
        .fetch_by_id(&id)?
        .ok_or_else(|| AppError::NotFound("Coupon not found".into()))?;
    Ok(Json(coupon))
}

pub async fn update_coupon(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut input): Json<CouponUpdate>,
) -> Result<Json<Coupon>> {
    if input.is_empty() {
        return Err(AppError::BadRequest("No fields to update".into()));
    }

    if let Some(code) = input.code.as_mut() {
        *code = normalize_code(code);
        if code.is_empty() {
            return Err(AppError::BadRequest("code cannot be empty".into()));
        }
        ensure_code_free(&state, code, Some(&id))?;
    }
    if let Some(from) = input.valid_from.as_mut() {
        *from = canonical_date("valid_from", from)?;
    }
    if let Some(to) = input.valid_to.as_mut() {
        *to = canonical_date("valid_to", to)?;
    }

    state.store.update(&id, &input)?;

    let coupon = state
        .store
        .fetch_by_id(&id)?
        .ok_or_else(|| AppError::NotFound("Coupon not found".into()))?;
    Ok(Json(coupon))
}

pub async fn delete_coupon(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.store.delete(&id)?;
    tracing::info!("Deleted coupon {}", id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_all_coupons(
    State(state): State<AppState>,
    Query(query): Query<DeleteAllQuery>,
) -> Result<Json<DeletedCount>> {
    if query.confirm.as_deref().map(str::trim) != Some(DELETE_ALL_CONFIRMATION) {
        return Err(AppError::BadRequest(format!(
            "Confirm by passing confirm={DELETE_ALL_CONFIRMATION}"
        )));
    }

    let deleted = state.store.delete_all()?;
    tracing::warn!("Deleted all coupons ({} records)", deleted);
    Ok(Json(DeletedCount { deleted }))
}
