//! Transport-level error type.

use thiserror::Error;

/// Convenient alias for transport results.
pub type TransportResult<T> = Result<T, TransportError>;

/// Failures that happen before an HTTP status is available.
///
/// Non-2xx replies are NOT errors at this layer; the API clients decide what
/// a given status means.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Timeout at transport level.
    #[error("timeout")]
    Timeout,

    /// DNS/connect/reset failures.
    #[error("connection error: {0}")]
    Connect(String),

    /// The request could not be built (bad URL, bad header value, ...).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Any other transport failure without an HTTP status.
    #[error("network error: {0}")]
    Network(String),

    /// A scripted transport ran out of canned responses.
    #[error("scripted transport has no response left for {method} {url}")]
    Exhausted {
        /// Method of the unanswered request.
        method: String,
        /// URL of the unanswered request.
        url: String,
    },
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return TransportError::Timeout;
        }
        if e.is_connect() {
            return TransportError::Connect(e.to_string());
        }
        if e.is_builder() {
            return TransportError::InvalidRequest(e.to_string());
        }
        TransportError::Network(e.to_string())
    }
}
