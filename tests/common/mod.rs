//! Shared helpers for integration tests.
#![allow(dead_code)]

pub use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
pub use chrono::{Days, Local, NaiveDate};
pub use serde_json::{Value, json};

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use coupon_desk::auth::{AdminAuth, hash_password};
use coupon_desk::dates;
use coupon_desk::db::{AppState, create_pool, init_db};
use coupon_desk::messages::Locale;
use coupon_desk::models::NewCoupon;
use coupon_desk::store::{CouponStore, SqliteCouponStore};

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "correct horse battery staple";

/// A file-backed database so every pooled connection sees the same data.
pub struct TestEnv {
    pub state: AppState,
    pub store: SqliteCouponStore,
    _dir: TempDir,
}

impl TestEnv {
    pub fn app(&self) -> Router {
        coupon_desk::app(self.state.clone())
    }
}

pub fn test_env() -> TestEnv {
    test_env_with(|store| store)
}

pub fn test_env_with(configure: impl FnOnce(SqliteCouponStore) -> SqliteCouponStore) -> TestEnv {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("coupons.db");
    let pool = create_pool(path.to_str().unwrap()).unwrap();
    {
        let conn = pool.get().unwrap();
        init_db(&conn).unwrap();
    }

    let store = configure(SqliteCouponStore::new(pool));
    let auth = AdminAuth::new(
        ADMIN_EMAIL,
        &hash_password(ADMIN_PASSWORD),
        b"integration-test-session-secret!",
        Duration::from_secs(3600),
    );

    TestEnv {
        state: AppState {
            store: Arc::new(store.clone()),
            auth,
            default_locale: Locale::En,
        },
        store,
        _dir: dir,
    }
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn days_from_today(offset: i64) -> String {
    let date = if offset >= 0 {
        today().checked_add_days(Days::new(offset as u64))
    } else {
        today().checked_sub_days(Days::new(offset.unsigned_abs()))
    };
    dates::format_canonical(date.unwrap())
}

/// Store an unused coupon valid from `from` to `to` days relative to today.
pub fn seed_coupon(store: &SqliteCouponStore, code: &str, from: i64, to: i64) -> String {
    store
        .create(&NewCoupon::unused(code, days_from_today(from), days_from_today(to)))
        .unwrap()
}

pub fn admin_token(state: &AppState) -> String {
    state.auth.sign_in(ADMIN_EMAIL, ADMIN_PASSWORD).unwrap().token
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
