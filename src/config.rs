use std::env;
use std::time::Duration;

use crate::auth;
use crate::messages::Locale;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub admin_email: String,
    /// Salted SHA-256 digest of the admin password (see `auth::hash_password`).
    pub admin_password_digest: Option<String>,
    /// Session signing secret. Random per process when unset, so sessions do
    /// not survive a restart.
    pub session_secret: Vec<u8>,
    pub session_ttl: Duration,
    pub default_locale: Locale,
    pub dev_mode: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("COUPON_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        // A plain password is accepted for local setups; the digest wins when both are set.
        let admin_password_digest = env::var("ADMIN_PASSWORD_SHA256")
            .ok()
            .filter(|d| !d.trim().is_empty())
            .or_else(|| {
                env::var("ADMIN_PASSWORD")
                    .ok()
                    .filter(|p| !p.is_empty())
                    .map(|p| auth::hash_password(&p))
            });

        let session_secret = match env::var("SESSION_SECRET") {
            Ok(secret) if !secret.is_empty() => secret.into_bytes(),
            _ => {
                tracing::warn!("SESSION_SECRET not set; using a random secret for this process");
                auth::random_secret()
            }
        };

        let session_ttl_hours: u64 = env::var("SESSION_TTL_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|h| *h > 0)
            .unwrap_or(12);

        let default_locale = env::var("DEFAULT_LOCALE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default();

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "coupons.db".to_string()),
            admin_email: env::var("ADMIN_EMAIL").unwrap_or_default(),
            admin_password_digest,
            session_secret,
            session_ttl: Duration::from_secs(session_ttl_hours * 3600),
            default_locale,
            dev_mode,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
