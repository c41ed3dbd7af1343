//! Tether Core - shared types and transport boundaries.
//!
//! This crate provides:
//! - [`Frame`], the typed unit exchanged over a channel, and its JSON codec
//! - [`ReconnectBackoff`] and [`RetryBackoff`] delay policies
//! - [`Endpoint`] resolution to `ws`/`wss` URLs
//! - The [`Connector`] and [`HttpTransport`] boundaries, plus the
//!   [`CredentialProvider`] consulted before every connect and request
//! - [`ConnectionState`] and the [`FrameSink`] send contract
//!
//! Nothing here performs I/O on its own; concrete transports live in
//! `tether-channel` (WebSocket) and `tether-request` (HTTP).

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod backoff;
pub mod credentials;
pub mod endpoint;
pub mod error;
pub mod frame;
pub mod http;
pub mod sink;
pub mod socket;
pub mod state;

pub use backoff::{ReconnectBackoff, RetryBackoff};
pub use credentials::{CredentialProvider, NoCredentials, StaticCredentials};
pub use endpoint::Endpoint;
pub use error::{
    BoxError, CredentialError, EndpointError, FrameError, SendError, TransportError,
};
pub use frame::{Frame, frame_type};
pub use http::{HttpResponse, HttpTransport, Method, OutboundRequest};
pub use sink::FrameSink;
pub use socket::{Connector, Socket, SocketEvent, SocketSink, SocketStream, SocketWrite};
pub use state::{ConnectionState, StateChange};
