//! Hosted backend error types.

use thiserror::Error;

/// Errors from the hosted backend (row API and auth service).
#[derive(Debug, Error)]
pub enum BackendError {
    /// Network-level failure (connect, timeout, body read).
    #[error("backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("backend returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated for diagnostics.
        body: String,
    },

    /// The response body could not be decoded.
    #[error("backend response decode failed: {0}")]
    Decode(#[from] serde_json::Error),

    /// The backend returned a structurally valid but unusable payload.
    #[error("invalid backend payload: {0}")]
    Invalid(String),

    /// A backend endpoint URL could not be constructed.
    #[error("invalid backend url: {0}")]
    Url(#[from] url::ParseError),
}

impl BackendError {
    /// Whether the error is transient and worth retrying.
    ///
    /// Network-class failures and throttling/server statuses qualify;
    /// client errors and malformed payloads do not.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Status { status, .. } => {
                matches!(status, 408 | 429) || *status >= 500
            }
            Self::Decode(_) | Self::Invalid(_) | Self::Url(_) => false,
        }
    }
}
