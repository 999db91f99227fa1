//! Application-wide error types.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
///
/// Messages are rendered verbatim to API callers, so variants that wrap an
/// underlying failure display it without a prefix.
#[derive(Debug, Error)]
pub enum AppError {
    /// Credentials were rejected by a backend.
    #[error("{0}")]
    Forbidden(String),

    /// Request could not be processed as sent.
    #[error("{0}")]
    Validation(String),

    /// Startup parameters are missing or malformed.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Any other failure.
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Forbidden(_) => 403,
            Self::Validation(_) => 422,
            Self::Configuration(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns a stable error code for logs.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
