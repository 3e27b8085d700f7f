//! Admin authentication: a single configured administrator, HS256 session tokens,
//! sign-out revocation and a broadcast of sign-out events.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use jwt_simple::prelude::{Claims, Duration as JwtDuration, HS256Key, MACLike, VerificationOptions};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tokio::sync::broadcast;

use crate::error::AuthError;

const PASSWORD_SALT: &str = "coupon-desk-admin-v1:";
const SIGN_OUT_CHANNEL_CAPACITY: usize = 64;

/// Salted SHA-256 digest (hex) of an admin password, as stored in configuration.
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(PASSWORD_SALT.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// 32 random bytes for signing session tokens when no secret is configured.
pub fn random_secret() -> Vec<u8> {
    let mut secret = vec![0u8; 32];
    rand::thread_rng().fill_bytes(&mut secret);
    secret
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    email: String,
}

/// Returned by a successful sign-in.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub email: String,
    pub expires_at: i64,
}

/// A verified session, attached to admin requests by the auth middleware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminSession {
    pub email: String,
    #[serde(skip)]
    pub jti: String,
    pub expires_at: i64,
}

struct Inner {
    email: String,
    password_digest: String,
    key: HS256Key,
    ttl: Duration,
    /// Signed-out token ids with their expiry (unix seconds).
    revoked: Mutex<HashMap<String, i64>>,
    sign_outs: broadcast::Sender<String>,
}

#[derive(Clone)]
pub struct AdminAuth {
    inner: Arc<Inner>,
}

impl AdminAuth {
    pub fn new(email: &str, password_digest: &str, secret: &[u8], ttl: Duration) -> Self {
        let (sign_outs, _) = broadcast::channel(SIGN_OUT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                email: email.trim().to_lowercase(),
                password_digest: password_digest.trim().to_lowercase(),
                key: HS256Key::from_bytes(secret),
                ttl,
                revoked: Mutex::new(HashMap::new()),
                sign_outs,
            }),
        }
    }

    pub fn admin_email(&self) -> &str {
        &self.inner.email
    }

    fn revoked(&self) -> MutexGuard<'_, HashMap<String, i64>> {
        self.inner
            .revoked
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email_ok = email.trim().to_lowercase() == self.inner.email;
        let password_ok: bool = hash_password(password)
            .as_bytes()
            .ct_eq(self.inner.password_digest.as_bytes())
            .into();

        if !(email_ok && password_ok) {
            tracing::warn!("Rejected admin sign-in for {}", email.trim());
            return Err(AuthError::InvalidCredentials);
        }

        let claims = Claims::with_custom_claims(
            SessionClaims {
                email: self.inner.email.clone(),
            },
            JwtDuration::from_secs(self.inner.ttl.as_secs()),
        )
        .with_jwt_id(uuid::Uuid::new_v4().to_string());

        let expires_at = claims
            .expires_at
            .map(|t| t.as_secs() as i64)
            .unwrap_or_default();

        let token = self
            .inner
            .key
            .authenticate(claims)
            .map_err(|e| AuthError::Signing(e.to_string()))?;

        tracing::info!("Admin {} signed in", self.inner.email);
        Ok(Session {
            token,
            email: self.inner.email.clone(),
            expires_at,
        })
    }

    pub fn verify(&self, token: &str) -> Result<AdminSession, AuthError> {
        let options = VerificationOptions {
            time_tolerance: Some(JwtDuration::from_secs(0)),
            ..Default::default()
        };
        let claims = self
            .inner
            .key
            .verify_token::<SessionClaims>(token, Some(options))
            .map_err(|_| AuthError::InvalidToken)?;

        let jti = claims.jwt_id.ok_or(AuthError::InvalidToken)?;
        if self.revoked().contains_key(&jti) {
            return Err(AuthError::Revoked);
        }

        Ok(AdminSession {
            email: claims.custom.email,
            jti,
            expires_at: claims
                .expires_at
                .map(|t| t.as_secs() as i64)
                .unwrap_or_default(),
        })
    }

    /// Revoke `token` and notify listeners. Returns the session that was ended.
    pub fn sign_out(&self, token: &str) -> Result<AdminSession, AuthError> {
        let session = self.verify(token)?;
        {
            let now = chrono::Utc::now().timestamp();
            let mut revoked = self.revoked();
            revoked.retain(|_, expires_at| *expires_at > now);
            revoked.insert(session.jti.clone(), session.expires_at);
        }
        // No receivers is fine.
        let _ = self.inner.sign_outs.send(session.jti.clone());
        tracing::info!("Admin {} signed out", session.email);
        Ok(session)
    }

    /// Receives the token id of every session that signs out.
    pub fn on_auth_state_change(&self) -> broadcast::Receiver<String> {
        self.inner.sign_outs.subscribe()
    }
}
