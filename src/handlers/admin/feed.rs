use std::time::Duration;

use axum::{
    extract::{
        State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    http::HeaderMap,
    response::Response,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast::error::RecvError, watch};
use tokio::time::Instant;

use crate::auth::AdminSession;
use crate::db::AppState;
use crate::error::{AppError, Result};
use crate::extractors::Query;
use crate::models::Coupon;
use crate::util::extract_bearer_token;

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    /// Browsers cannot set headers on a WebSocket handshake.
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Serialize)]
struct FeedSnapshot<'a> {
    coupons: &'a [Coupon],
}

/// Live coupon list: the full collection is pushed on connect and after every change.
pub async fn coupon_feed(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response> {
    let token = extract_bearer_token(&headers)
        .map(str::to_string)
        .or(query.token)
        .ok_or_else(|| AppError::Unauthorized("Missing session token".into()))?;
    let session = state.auth.verify(&token)?;

    Ok(ws.on_upgrade(move |socket| stream_snapshots(socket, state, session, token)))
}

async fn close(socket: &mut WebSocket, reason: &'static str) {
    let frame = CloseFrame {
        code: close_code::NORMAL,
        reason: reason.into(),
    };
    let _ = socket.send(Message::Close(Some(frame))).await;
}

async fn stream_snapshots(mut socket: WebSocket, state: AppState, session: AdminSession, token: String) {
    // Only the latest snapshot matters; a slow client skips intermediate ones.
    let (tx, mut snapshots) = watch::channel(Vec::<Coupon>::new());
    let mut sign_outs = state.auth.on_auth_state_change();

    let subscription = state.store.subscribe(Box::new(move |coupons: &[Coupon]| {
        tx.send_replace(coupons.to_vec());
    }));
    if !subscription.is_active() {
        close(&mut socket, "coupon feed unavailable").await;
        return;
    }

    let remaining = (session.expires_at - chrono::Utc::now().timestamp()).max(0) as u64;
    let expiry = tokio::time::sleep_until(Instant::now() + Duration::from_secs(remaining));
    tokio::pin!(expiry);

    tracing::debug!("Coupon feed opened for {}", session.email);

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let coupons = snapshots.borrow_and_update().clone();
                let payload = match serde_json::to_string(&FeedSnapshot { coupons: &coupons }) {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::error!("Failed to encode coupon snapshot: {}", e);
                        continue;
                    }
                };
                if socket.send(Message::Text(payload.into())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            event = sign_outs.recv() => match event {
                Err(RecvError::Closed) => break,
                // A lagged receiver may have missed our own sign-out.
                Ok(_) | Err(RecvError::Lagged(_)) => {
                    if state.auth.verify(&token).is_err() {
                        close(&mut socket, "signed out").await;
                        break;
                    }
                }
            },
            _ = &mut expiry => {
                close(&mut socket, "session expired").await;
                break;
            }
        }
    }

    subscription.unsubscribe();
    tracing::debug!("Coupon feed closed for {}", session.email);
}
