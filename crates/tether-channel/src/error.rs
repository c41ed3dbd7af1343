//! Channel errors.

use std::sync::Arc;

use thiserror::Error;

use tether_core::{EndpointError, SendError, TransportError};

/// Result type for channel operations.
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Errors surfaced by [`Channel`](crate::Channel) lifecycle operations.
///
/// Transport failures never reach the caller directly; the channel retries
/// them and reports [`ChannelError::ConnectionFailed`] once the reconnect
/// budget is spent.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The channel was closed and cannot be reopened.
    #[error("channel is closed")]
    Closed,

    /// The endpoint does not resolve to a socket URL.
    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    /// A frame could not be sent.
    #[error(transparent)]
    Send(#[from] SendError),

    /// Every reconnect attempt failed.
    #[error("connection failed after {attempts} reconnect attempts: {source}")]
    ConnectionFailed {
        /// Reconnect attempts made before giving up.
        attempts: u32,
        /// The failure that ended the last attempt.
        source: Arc<TransportError>,
    },
}
