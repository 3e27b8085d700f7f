use axum::extract::State;
use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::db::AppState;
use crate::extractors::Json;
use crate::messages::Locale;
use crate::redemption::{self, RedeemContext, RedemptionOutcome};

#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    pub code: String,
    /// Name recorded as `used_by`; "unknown" when absent.
    #[serde(default)]
    pub used_by: Option<String>,
    #[serde(default)]
    pub lang: Option<Locale>,
}

#[derive(Debug, Serialize)]
pub struct RedeemResponse {
    #[serde(flatten)]
    pub outcome: RedemptionOutcome,
    pub success: bool,
    pub message: String,
}

/// Every outcome, including failures, is a 200 with a localized message.
pub async fn redeem_coupon(
    State(state): State<AppState>,
    Json(input): Json<RedeemRequest>,
) -> Json<RedeemResponse> {
    let locale = input.lang.unwrap_or(state.default_locale);
    let ctx = RedeemContext::new(Local::now().date_naive(), locale).with_actor(input.used_by);

    let outcome = redemption::redeem(state.store.as_ref(), &input.code, &ctx);

    Json(RedeemResponse {
        success: outcome.is_success(),
        message: outcome.message(locale),
        outcome,
    })
}
