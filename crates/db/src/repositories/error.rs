//! Repository error type shared by every repository.

use hisab_core::LedgerError;
use hisab_shared::AppError;
use sea_orm::DbErr;
use uuid::Uuid;

/// Error types for repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Row not found, or not visible to the company.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity name.
        entity: &'static str,
        /// Requested ID.
        id: Uuid,
    },

    /// Unique value already taken.
    #[error("{0}")]
    Conflict(String),

    /// Business rule violation.
    #[error(transparent)]
    Rule(#[from] LedgerError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl RepositoryError {
    /// Shorthand for a missing row.
    #[must_use]
    pub const fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Rule(e) => e.error_code(),
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Conflict(_) => 409,
            Self::Rule(e) => e.http_status_code(),
            Self::Database(_) => 500,
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                Self::NotFound(format!("{entity} not found: {id}"))
            }
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            RepositoryError::Rule(rule) => match rule.http_status_code() {
                400 => Self::invalid(rule.error_code(), rule.to_string()),
                409 => Self::Conflict(rule.to_string()),
                _ => Self::rule(rule.error_code(), rule.to_string()),
            },
            RepositoryError::Database(db) => Self::Database(db.to_string()),
        }
    }
}

/// Maps a unique-constraint violation to `Conflict`, leaving other errors as-is.
pub(crate) fn on_unique_violation(err: DbErr, message: impl FnOnce() -> String) -> RepositoryError {
    match err.sql_err() {
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => RepositoryError::Conflict(message()),
        _ => RepositoryError::Database(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rule_errors_keep_code_and_status() {
        let err = RepositoryError::from(LedgerError::InsufficientStock {
            product_id: Uuid::nil(),
            available: dec!(1),
            required: dec!(2),
        });
        assert_eq!(err.status_code(), 422);
        assert_eq!(err.error_code(), "INSUFFICIENT_STOCK");

        let app: AppError = err.into();
        assert_eq!(app.status_code(), 422);
        assert_eq!(app.error_code(), "INSUFFICIENT_STOCK");
    }

    #[test]
    fn test_invalid_input_maps_to_400() {
        let app: AppError = RepositoryError::from(LedgerError::EmptyDocument).into();
        assert_eq!(app.status_code(), 400);
        assert_eq!(app.error_code(), "EMPTY_DOCUMENT");
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let app: AppError = RepositoryError::not_found("Sale", Uuid::nil()).into();
        assert_eq!(app.status_code(), 404);
        assert_eq!(
            app.public_message(),
            "Sale not found: 00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_database_error_is_masked() {
        let app: AppError = RepositoryError::Database(DbErr::Custom("boom".into())).into();
        assert_eq!(app.status_code(), 500);
        assert_eq!(app.public_message(), "An error occurred");
    }
}
