use axum::{
    extract::{Extension, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::auth::{AdminSession, Session};
use crate::db::AppState;
use crate::error::Result;
use crate::extractors::Json;
use crate::middleware::SessionToken;

#[derive(Debug, Deserialize)]
pub struct SignIn {
    pub email: String,
    pub password: String,
}

pub async fn sign_in(
    State(state): State<AppState>,
    Json(input): Json<SignIn>,
) -> Result<Json<Session>> {
    let session = state.auth.sign_in(&input.email, &input.password)?;
    Ok(Json(session))
}

pub async fn current_session(Extension(session): Extension<AdminSession>) -> Json<AdminSession> {
    Json(session)
}

pub async fn sign_out(
    State(state): State<AppState>,
    Extension(SessionToken(token)): Extension<SessionToken>,
) -> Result<StatusCode> {
    state.auth.sign_out(&token)?;
    Ok(StatusCode::NO_CONTENT)
}
