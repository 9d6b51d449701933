//! Backing-store error classification
//!
//! Every tenant-scoped service reports storage failures through this single
//! mapping, so callers see the same stable kinds regardless of which MySQL
//! error code produced them.

use crate::error::{AppError, ErrorCause};
use sqlx::error::ErrorKind as DbErrorKind;

pub fn classify_db_error(err: sqlx::Error) -> AppError {
    let db_kind = match &err {
        sqlx::Error::Database(db) => Some(db.kind()),
        _ => None,
    };

    match (err, db_kind) {
        (sqlx::Error::RowNotFound, _) => {
            AppError::NotFound(ErrorCause::RecordNotFound, "record not found".to_string())
        }
        (_, Some(DbErrorKind::UniqueViolation)) => AppError::Conflict(
            ErrorCause::UniqueViolation,
            "resource already exists".to_string(),
        ),
        (_, Some(DbErrorKind::ForeignKeyViolation)) => AppError::BadRequest(
            ErrorCause::ForeignKeyViolation,
            "referenced resource does not exist".to_string(),
        ),
        (err, _) => AppError::Internal(ErrorCause::DatabaseError, anyhow::Error::new(err)),
    }
}
