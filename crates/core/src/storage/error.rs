//! Storage error types.

use std::error::Error as _;

use filegate_shared::AppError;
use suppaftp::{FtpError, Status};
use thiserror::Error;

use super::config::BackendKind;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Backend rejected the configured credentials.
    #[error("authentication with {backend} backend failed: {message}")]
    AuthenticationFailed {
        /// Backend that rejected the credentials.
        backend: BackendKind,
        /// Driver message.
        message: String,
    },

    /// Backend could not be reached or did not answer in time.
    #[error("storage backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Object absent where the backend distinguishes it.
    #[error("file not found: {0}")]
    NotFound(String),

    /// Upload aborted part-way.
    #[error("transfer failed: {0}")]
    TransferFailed(String),

    /// Startup parameters are missing or malformed.
    #[error("storage configuration error: {0}")]
    ConfigurationInvalid(String),

    /// Operation not offered by this backend.
    #[error("operation not supported: {0}")]
    Unsupported(String),

    /// Request selected a backend that is not configured.
    #[error("storage backend '{backend}' is not configured")]
    BackendNotConfigured {
        /// Requested backend.
        backend: BackendKind,
    },

    /// Filename does not resolve to a storable key.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    /// Any other driver failure.
    #[error("storage operation failed: {0}")]
    Operation(String),
}

impl StorageError {
    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::ConfigurationInvalid(msg.into())
    }

    /// Create an unsupported-operation error.
    #[must_use]
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Classify an OpenDAL error raised by `backend`.
    #[must_use]
    pub fn from_backend(backend: BackendKind, err: &opendal::Error) -> Self {
        if backend == BackendKind::Ftp && is_rejected_login(err) {
            return Self::AuthenticationFailed {
                backend,
                message: err.to_string(),
            };
        }

        match err.kind() {
            opendal::ErrorKind::PermissionDenied => Self::AuthenticationFailed {
                backend,
                message: err.to_string(),
            },
            opendal::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            opendal::ErrorKind::Unsupported => Self::Unsupported(err.to_string()),
            opendal::ErrorKind::ConfigInvalid => Self::ConfigurationInvalid(err.to_string()),
            _ if err.is_temporary() => Self::BackendUnavailable(err.to_string()),
            _ => Self::Operation(err.to_string()),
        }
    }

    /// Recast a failure that interrupted an upload after `written` bytes.
    ///
    /// Credential errors keep their kind so callers still see them as such.
    #[must_use]
    pub fn into_transfer_failure(self, written: u64) -> Self {
        match self {
            Self::AuthenticationFailed { .. } | Self::TransferFailed(_) => self,
            other => Self::TransferFailed(format!("aborted after {written} bytes: {other}")),
        }
    }
}

/// The FTP driver reports a refused login (`530`) as a generic error; the
/// server reply is only visible on the wrapped `FtpError`.
fn is_rejected_login(err: &opendal::Error) -> bool {
    std::iter::successors(err.source(), |source| (*source).source())
        .filter_map(|source| source.downcast_ref::<FtpError>())
        .any(|ftp| {
            matches!(
                ftp,
                FtpError::UnexpectedResponse(response) if response.status == Status::NotLoggedIn
            )
        })
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::AuthenticationFailed { backend, .. } => {
                Self::Forbidden(format!("Invalid {} credentials", backend.label()))
            }
            StorageError::InvalidKey(_) => Self::Validation(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}
