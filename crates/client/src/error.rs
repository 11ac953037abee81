//! Errors surfaced to callers of the client.

use thiserror::Error;

use crate::config::ConfigError;
use crate::refresh::RefreshError;
use crate::store::StoreError;

/// Errors that can occur when talking to the ChinChin API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never got a response (DNS, connect, TLS, reset).
    #[error("Connection failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The request did not complete within the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// No usable session: either no token was available or the refresh
    /// failed. The caller must log in again.
    #[error("Unauthorized")]
    Unauthorized,

    /// The server answered with a non-success status.
    #[error("{message}")]
    Application { status: u16, message: String },

    /// Rejected locally before any request was made.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A 2xx body could not be mapped to the expected record.
    #[error("Unexpected response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Credentials could not be read or written.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ApiError {
    /// HTTP status carried by the error, if the server answered at all.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Application { status, .. } => Some(*status),
            Self::Unauthorized => Some(401),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(err)
        }
    }
}

impl From<RefreshError> for ApiError {
    fn from(_: RefreshError) -> Self {
        Self::Unauthorized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_error_displays_server_message() {
        let err = ApiError::Application {
            status: 409,
            message: "Product already exists".to_string(),
        };
        assert_eq!(err.to_string(), "Product already exists");
        assert_eq!(err.status(), Some(409));
    }

    #[test]
    fn test_refresh_failures_become_unauthorized() {
        let err: ApiError = RefreshError::Rejected(400).into();
        assert!(matches!(err, ApiError::Unauthorized));
    }
}
