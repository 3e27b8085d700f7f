use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth::AdminSession;
use crate::db::AppState;
use crate::error::{AppError, Result};
use crate::util::extract_bearer_token;

/// Bearer token of the current request, kept so handlers can end the session.
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

/// Reject requests without a live admin session; otherwise attach the
/// [`AdminSession`] and [`SessionToken`] as request extensions.
pub async fn admin_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let token = extract_bearer_token(request.headers())
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".into()))?
        .to_string();

    let session: AdminSession = state.auth.verify(&token)?;

    request.extensions_mut().insert(session);
    request.extensions_mut().insert(SessionToken(token));
    Ok(next.run(request).await)
}
