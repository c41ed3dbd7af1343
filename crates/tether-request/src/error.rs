//! Request errors.

use thiserror::Error;

use tether_core::{CredentialError, TransportError};

/// Why a single attempt did not succeed.
#[derive(Debug, Error)]
pub enum AttemptError {
    /// Non-2xx response other than 429.
    #[error("server responded with status {status}")]
    Status {
        /// Status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// HTTP 429.
    #[error("rate limited by server (HTTP 429)")]
    RateLimited,

    /// The request never produced a response.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors returned by [`ResilientRequest::execute`](crate::ResilientRequest::execute).
#[derive(Debug, Error)]
pub enum RequestError {
    /// Every attempt failed.
    #[error("request failed after {attempts} attempts: {last}")]
    Exhausted {
        /// Attempts made.
        attempts: u32,
        /// Failure of the final attempt.
        #[source]
        last: AttemptError,
    },

    /// The credential provider could not supply headers. Not retried.
    #[error("credentials unavailable: {0}")]
    Credentials(#[from] CredentialError),

    /// The descriptor cannot be sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type for request operations.
pub type RequestResult<T> = Result<T, RequestError>;
