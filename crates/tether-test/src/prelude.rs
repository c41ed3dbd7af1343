//! Prelude module - commonly used test helpers.
//!
//! Use `use tether_test::prelude::*;` to import all helpers.

pub use crate::{
    AcceptedSockets, ConnectOutcome, MockConnector, MockHttpTransport, MockSocketHandle,
    RecordedRequest, RecordingSender, discovery_endpoint, init_test_logging, json_response,
    session_started_json, thread_endpoint,
};
