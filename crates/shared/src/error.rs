//! Application-wide error types.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Malformed input rejected by a named rule.
    #[error("Invalid input: {message}")]
    Invalid {
        /// Rule identifier.
        code: &'static str,
        /// Human readable explanation.
        message: String,
    },

    /// Business rule violation.
    ///
    /// `code` is the machine-readable rule identifier (e.g. `INSUFFICIENT_STOCK`).
    #[error("Business rule violation: {message}")]
    BusinessRule {
        /// Rule identifier.
        code: &'static str,
        /// Human readable explanation.
        message: String,
    },

    /// Conflict (e.g., duplicate entry).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Shorthand for a business rule violation.
    #[must_use]
    pub fn rule(code: &'static str, message: impl Into<String>) -> Self {
        Self::BusinessRule {
            code,
            message: message.into(),
        }
    }

    /// Shorthand for malformed input with a rule code.
    #[must_use]
    pub fn invalid(code: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            code,
            message: message.into(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Validation(_) | Self::Invalid { .. } => 400,
            Self::BusinessRule { .. } => 422,
            Self::Conflict(_) => 409,
            Self::Database(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Invalid { code, .. } | Self::BusinessRule { code, .. } => code,
            Self::Conflict(_) => "CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the message safe to show to API clients.
    ///
    /// Database and internal failures are masked.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::NotFound(msg) | Self::Validation(msg) | Self::Conflict(msg) => msg.clone(),
            Self::Invalid { message, .. } | Self::BusinessRule { message, .. } => message.clone(),
            Self::Database(_) | Self::Internal(_) => "An error occurred".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::missing_sale(AppError::NotFound("Sale not found".into()), 404, "NOT_FOUND")]
    #[case::bad_field(AppError::Validation("name is required".into()), 400, "VALIDATION_ERROR")]
    #[case::empty_document(AppError::invalid("EMPTY_DOCUMENT", "no items"), 400, "EMPTY_DOCUMENT")]
    #[case::short_stock(AppError::rule("INSUFFICIENT_STOCK", "only 3 left"), 422, "INSUFFICIENT_STOCK")]
    #[case::duplicate_sku(AppError::Conflict("SKU taken".into()), 409, "CONFLICT")]
    #[case::pool_closed(AppError::Database("pool closed".into()), 500, "DATABASE_ERROR")]
    #[case::panic(AppError::Internal("tenant missing".into()), 500, "INTERNAL_ERROR")]
    fn test_status_and_code(#[case] err: AppError, #[case] status: u16, #[case] code: &str) {
        assert_eq!(err.status_code(), status);
        assert_eq!(err.error_code(), code);
    }

    #[test]
    fn test_rule_message_reaches_client() {
        let err = AppError::rule("OVERPAYMENT", "paid 120 exceeds payable 100");
        assert_eq!(err.to_string(), "Business rule violation: paid 120 exceeds payable 100");
        assert_eq!(err.public_message(), "paid 120 exceeds payable 100");
    }

    #[rstest]
    #[case(AppError::Database("relation \"sales\" does not exist".into()))]
    #[case(AppError::Internal("tenant missing".into()))]
    fn test_internal_failures_are_masked(#[case] err: AppError) {
        assert_eq!(err.public_message(), "An error occurred");
    }
}
