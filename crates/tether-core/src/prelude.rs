//! Prelude module - commonly used types for convenient import.
//!
//! Use `use tether_core::prelude::*;` to import all essential types.

// Frames
pub use crate::{Frame, frame_type};

// Policies
pub use crate::{ReconnectBackoff, RetryBackoff};

// Addressing & credentials
pub use crate::{CredentialProvider, Endpoint, NoCredentials, StaticCredentials};

// Transport boundaries
pub use crate::{Connector, FrameSink, HttpResponse, HttpTransport, Method, OutboundRequest};

// State
pub use crate::{ConnectionState, StateChange};

// Errors
pub use crate::{CredentialError, EndpointError, FrameError, SendError, TransportError};
