//! Error types for rankvote.

use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // === Client Errors ===
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Contest not found: {0}")]
    ContestNotFound(String),

    #[error("Ballot not found: {0}")]
    BallotNotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    // === Server Errors ===
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the stable error code for this error, for API responses
    /// and log correlation.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::ContestNotFound(_) => "CONTEST_NOT_FOUND",
            Self::BallotNotFound(_) => "BALLOT_NOT_FOUND",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Delivery(_) => "DELIVERY_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns whether this error should be logged at error level.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Storage(_) | Self::Delivery(_) | Self::Config(_) | Self::Internal(_)
        )
    }
}

// === From implementations ===

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(
            AppError::Validation("bad".to_string()).error_code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(
            AppError::Conflict("dup".to_string()).error_code(),
            "CONFLICT"
        );
        assert_eq!(
            AppError::ContestNotFound("x".to_string()).error_code(),
            "CONTEST_NOT_FOUND"
        );
    }

    #[test]
    fn test_server_error_classification() {
        assert!(AppError::Storage("down".to_string()).is_server_error());
        assert!(AppError::Delivery("timeout".to_string()).is_server_error());
        assert!(!AppError::Validation("bad".to_string()).is_server_error());
        assert!(!AppError::Conflict("dup".to_string()).is_server_error());
    }
}
