//! Duplex message-stream boundary.
//!
//! A [`Connector`] produces a fresh [`Socket`] per handshake. The socket is
//! split so the channel driver can poll the read half inside `select!`
//! while writing through the other.

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Sink, Stream};
use url::Url;

use crate::error::TransportError;

/// Close code for a normal, intentional closure.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Close code used when the stream ends without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Close code reported for a close frame that carries no status.
pub const NO_STATUS_RECEIVED: u16 = 1005;

/// Inbound socket event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// A text message.
    Text(String),
    /// The peer sent a close frame.
    Closed {
        /// Close code from the frame.
        code: u16,
    },
}

/// Outbound socket write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketWrite {
    /// A text message.
    Text(String),
    /// A close frame with the given code.
    Close(u16),
}

/// Write half of a socket.
pub type SocketSink = Pin<Box<dyn Sink<SocketWrite, Error = TransportError> + Send>>;

/// Read half of a socket. Ends when the connection drops.
pub type SocketStream = Pin<Box<dyn Stream<Item = Result<SocketEvent, TransportError>> + Send>>;

/// One live connection.
pub struct Socket {
    /// Write half.
    pub sink: SocketSink,
    /// Read half.
    pub stream: SocketStream,
}

impl Socket {
    /// Assemble a socket from its halves.
    pub fn new(sink: SocketSink, stream: SocketStream) -> Self {
        Self { sink, stream }
    }
}

impl std::fmt::Debug for Socket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Socket").finish_non_exhaustive()
    }
}

/// Opens sockets.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Perform a handshake with `url`.
    async fn connect(&self, url: &Url) -> Result<Socket, TransportError>;
}
