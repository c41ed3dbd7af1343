//! Error types shared across the Tether crates.

use std::time::Duration;

use thiserror::Error;

use crate::state::ConnectionState;

/// Boxed error used where the concrete transport error type is not known
/// to this crate.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors decoding or encoding a [`Frame`](crate::Frame).
#[derive(Debug, Error)]
pub enum FrameError {
    /// The text was not valid JSON.
    #[error("invalid frame JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The JSON value was not an object.
    #[error("frame is not a JSON object")]
    NotAnObject,

    /// The object had no `type` field.
    #[error("frame is missing the `type` field")]
    MissingType,

    /// The `type` field was not a non-empty string.
    #[error("frame `type` must be a non-empty string")]
    InvalidType,
}

/// Errors resolving an [`Endpoint`](crate::Endpoint) to a URL.
#[derive(Debug, Error)]
pub enum EndpointError {
    /// The origin could not be parsed.
    #[error("invalid origin URL: {0}")]
    InvalidOrigin(#[from] url::ParseError),

    /// The origin scheme has no WebSocket counterpart.
    #[error("unsupported origin scheme '{0}'; expected http, https, ws or wss")]
    UnsupportedScheme(String),

    /// The origin cannot carry a path (e.g. `mailto:`).
    #[error("origin URL cannot be a base")]
    CannotBeABase,

    /// The path template has a placeholder but no parameter was supplied.
    #[error("path template '{0}' requires a parameter")]
    MissingParam(String),
}

/// Errors obtaining credentials from a
/// [`CredentialProvider`](crate::CredentialProvider).
#[derive(Debug, Error)]
pub enum CredentialError {
    /// No credentials are currently available.
    #[error("credentials unavailable: {0}")]
    Unavailable(String),

    /// The provider produced a value that cannot be sent.
    #[error("invalid credential value: {0}")]
    Invalid(String),
}

/// Socket- or HTTP-level failures.
///
/// On a channel these drive the reconnect sequence; on a request they are
/// retried until the attempt budget is spent.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Opening the connection failed.
    #[error("failed to connect: {0}")]
    Connect(#[source] BoxError),

    /// The handshake did not complete in time.
    #[error("handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),

    /// The peer closed the connection with a non-normal code.
    #[error("connection closed with code {0}")]
    Closed(u16),

    /// Reading from or writing to an open socket failed.
    #[error("socket error: {0}")]
    Socket(#[source] BoxError),

    /// The HTTP request could not be completed.
    #[error("HTTP transport error: {0}")]
    Http(#[source] BoxError),

    /// The endpoint could not be resolved.
    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    /// The credential provider failed.
    #[error(transparent)]
    Credentials(#[from] CredentialError),
}

impl TransportError {
    /// Wrap any error as a socket failure.
    pub fn socket<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Socket(Box::new(err))
    }

    /// Wrap any error as a connect failure.
    pub fn connect<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Connect(Box::new(err))
    }
}

/// Why an outbound frame was not transmitted.
#[derive(Debug, Error)]
pub enum SendError {
    /// Frames are only sent while the channel is open.
    #[error("channel is not open (state: {0})")]
    NotOpen(ConnectionState),

    /// The frame could not be serialized.
    #[error(transparent)]
    Encode(#[from] FrameError),

    /// The socket write failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The channel's driver stopped before acknowledging the send.
    #[error("channel driver stopped before the frame was sent")]
    Disconnected,
}
