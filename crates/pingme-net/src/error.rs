use pingme_shared::PingmeError;
use thiserror::Error;

/// Errors produced by the messaging collaborator.
#[derive(Error, Debug)]
pub enum NetError {
    /// Transport-level failure (connect, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The request did not complete within the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// The server answered with a non-success status.
    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The configured base URL could not be parsed.
    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),

    /// A payload decoded but does not describe a valid domain value.
    #[error("Payload error: {0}")]
    Payload(#[from] PingmeError),

    /// Failure reported by a non-HTTP implementation of the collaborator.
    #[error("{0}")]
    Other(String),
}

impl NetError {
    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            NetError::Timeout
        } else {
            NetError::Http(e)
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, NetError>;
