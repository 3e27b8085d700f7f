use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::dates::InvalidDate;

/// Failure of a record store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("coupon not found: {0}")]
    NotFound(String),
}

/// Errors raised while validating or redeeming a coupon.
#[derive(Debug, Error)]
pub enum CouponError {
    #[error("coupon code is empty")]
    EmptyCode,

    #[error(transparent)]
    InvalidDate(#[from] InvalidDate),

    #[error("coupon has no validity window")]
    MissingValidityWindow,

    #[error("coupon record has no identifier")]
    RecordIdMissing,

    #[error("coupon {0} is still unused but could not be marked used")]
    WriteNotApplied(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors raised while importing a spreadsheet.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("no valid coupon rows found; expected columns: code, type, validFrom, validTo")]
    EmptyFile,

    #[error("no worksheet found in the file")]
    NoSheet,

    #[error("unsupported file type: {0} (expected .xlsx, .xls, .ods or .csv)")]
    UnsupportedFileType(String),

    #[error("could not read file: {0}")]
    Malformed(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::Malformed(err.to_string())
    }
}

impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::Malformed(err.to_string())
    }
}

/// Admin sign-in and session failures.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("invalid or expired session token")]
    InvalidToken,

    #[error("session has been signed out")]
    Revoked,

    #[error("could not issue session token: {0}")]
    Signing(String),
}

/// HTTP-facing error returned by handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => AppError::NotFound("Coupon not found".into()),
            other => {
                tracing::error!("Store operation failed: {}", other);
                AppError::Internal("Store operation failed".into())
            }
        }
    }
}

impl From<ImportError> for AppError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Store(e) => e.into(),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Signing(msg) => {
                tracing::error!("Failed to sign session token: {}", msg);
                AppError::Internal("Failed to create session".into())
            }
            other => AppError::Unauthorized(other.to_string()),
        }
    }
}

impl From<InvalidDate> for AppError {
    fn from(err: InvalidDate) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
