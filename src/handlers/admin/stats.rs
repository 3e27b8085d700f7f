use axum::extract::State;
use chrono::Local;

use crate::db::AppState;
use crate::error::Result;
use crate::extractors::Json;
use crate::models::CouponStats;
use crate::stats::compute_stats;

pub async fn coupon_stats(State(state): State<AppState>) -> Result<Json<CouponStats>> {
    let coupons = state.store.fetch_all()?;
    Ok(Json(compute_stats(&coupons, Local::now().date_naive())))
}
