mod coupons;
mod feed;
mod import;
mod session;
mod stats;

pub use coupons::*;
pub use feed::*;
pub use import::*;
pub use session::*;
pub use stats::*;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
};

use crate::db::AppState;
use crate::middleware::admin_auth;

/// Largest spreadsheet accepted by the import endpoint.
const IMPORT_BODY_LIMIT: usize = 10 * 1024 * 1024;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/session", get(current_session))
        .route("/admin/session", delete(sign_out))
        .route("/admin/coupons", get(list_coupons))
        .route("/admin/coupons", post(create_coupon))
        .route("/admin/coupons", delete(delete_all_coupons))
        .route(
            "/admin/coupons/import",
            post(import_spreadsheet).layer(DefaultBodyLimit::max(IMPORT_BODY_LIMIT)),
        )
        .route("/admin/coupons/{id}", get(get_coupon))
        .route("/admin/coupons/{id}", put(update_coupon))
        .route("/admin/coupons/{id}", delete(delete_coupon))
        .route("/admin/stats", get(coupon_stats))
        .route_layer(middleware::from_fn_with_state(state, admin_auth))
        .merge(
            Router::new()
                // Unauthenticated: sign-in, and the feed checks its own token.
                .route("/admin/session", post(sign_in))
                .route("/admin/coupons/feed", get(coupon_feed)),
        )
}
