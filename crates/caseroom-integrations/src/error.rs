//! Collaborator error type.

use std::time::Duration;

use thiserror::Error;

/// Failure of a remote collaborator call.
///
/// These never reach clients; callers recover with a fallback adapter.
#[derive(Debug, Error)]
pub enum IntegrationError {
    /// The request could not be sent or the connection failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote API answered with a non-success status.
    #[error("remote API returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The response could not be understood.
    #[error("unexpected response: {0}")]
    Parse(String),

    /// The call did not finish in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl From<serde_json::Error> for IntegrationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}
