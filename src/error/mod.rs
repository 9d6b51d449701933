//! Unified error handling for Storegate Core
//!
//! Every failure surfaced by this crate carries one of six stable kinds plus a
//! machine-readable cause tag. Only the kind and message reach the client; the
//! cause tag is written to the log.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Message shared by every store access denial, whatever the underlying cause.
pub const STORE_ACCESS_DENIED: &str = "Access to this store is denied";

/// Internal cause tag for logging and telemetry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCause {
    NotAuthenticated,
    MissingStoreId,
    InvalidStoreIdFormat,
    StoreNotFound,
    NotAMember,
    StoreIdMismatch,
    RecordNotFound,
    UniqueViolation,
    ForeignKeyViolation,
    InvalidQuery,
    DatabaseError,
    Unexpected,
}

impl ErrorCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCause::NotAuthenticated => "NOT_AUTHENTICATED",
            ErrorCause::MissingStoreId => "MISSING_STORE_ID",
            ErrorCause::InvalidStoreIdFormat => "INVALID_STORE_ID_FORMAT",
            ErrorCause::StoreNotFound => "STORE_NOT_FOUND",
            ErrorCause::NotAMember => "NOT_A_MEMBER",
            ErrorCause::StoreIdMismatch => "STORE_ID_MISMATCH",
            ErrorCause::RecordNotFound => "RECORD_NOT_FOUND",
            ErrorCause::UniqueViolation => "UNIQUE_VIOLATION",
            ErrorCause::ForeignKeyViolation => "FOREIGN_KEY_VIOLATION",
            ErrorCause::InvalidQuery => "INVALID_QUERY",
            ErrorCause::DatabaseError => "DATABASE_ERROR",
            ErrorCause::Unexpected => "UNEXPECTED",
        }
    }
}

impl std::fmt::Display for ErrorCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable error kind exposed to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthenticated,
    BadRequest,
    Forbidden,
    NotFound,
    Conflict,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unauthenticated: {1}")]
    Unauthenticated(ErrorCause, String),

    #[error("Bad request: {1}")]
    BadRequest(ErrorCause, String),

    #[error("Forbidden: {1}")]
    Forbidden(ErrorCause, String),

    #[error("Not found: {1}")]
    NotFound(ErrorCause, String),

    #[error("Conflict: {1}")]
    Conflict(ErrorCause, String),

    #[error("Internal error: {1}")]
    Internal(ErrorCause, #[source] anyhow::Error),
}

impl AppError {
    /// Uniform denial for any store the caller cannot use. Whether the store
    /// exists is recorded only in `cause`.
    pub fn store_access_denied(cause: ErrorCause) -> Self {
        AppError::Forbidden(cause, STORE_ACCESS_DENIED.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Unauthenticated(..) => ErrorKind::Unauthenticated,
            AppError::BadRequest(..) => ErrorKind::BadRequest,
            AppError::Forbidden(..) => ErrorKind::Forbidden,
            AppError::NotFound(..) => ErrorKind::NotFound,
            AppError::Conflict(..) => ErrorKind::Conflict,
            AppError::Internal(..) => ErrorKind::Internal,
        }
    }

    pub fn cause(&self) -> ErrorCause {
        match self {
            AppError::Unauthenticated(cause, _)
            | AppError::BadRequest(cause, _)
            | AppError::Forbidden(cause, _)
            | AppError::NotFound(cause, _)
            | AppError::Conflict(cause, _)
            | AppError::Internal(cause, _) => *cause,
        }
    }

    /// Message safe to show to the caller. Internal details never leave the process.
    pub fn client_message(&self) -> String {
        match self {
            AppError::Unauthenticated(_, msg)
            | AppError::BadRequest(_, msg)
            | AppError::Forbidden(_, msg)
            | AppError::NotFound(_, msg)
            | AppError::Conflict(_, msg) => msg.clone(),
            AppError::Internal(..) => "An internal error occurred".to_string(),
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        match &self {
            AppError::Internal(cause, e) => {
                tracing::error!(cause = %cause, "Internal error: {:?}", e);
            }
            other => {
                tracing::debug!(kind = %kind, cause = %other.cause(), "Request rejected");
            }
        }

        let body = Json(ErrorResponse {
            error: kind.as_str(),
            message: self.client_message(),
        });

        (kind.status_code(), body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        crate::query::classify_db_error(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(ErrorCause::Unexpected, err)
    }
}
