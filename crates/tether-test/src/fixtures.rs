//! Test fixtures.

use serde_json::Value;
use tether_core::{Endpoint, HttpResponse};

/// Origin used by the fixture endpoints.
pub const TEST_ORIGIN: &str = "https://host";

/// `wss://host/api/v1/ws/discovery`
#[must_use]
#[allow(clippy::missing_panics_doc)]
pub fn discovery_endpoint() -> Endpoint {
    Endpoint::new(TEST_ORIGIN, "/api/v1/ws/discovery").expect("fixture endpoint is valid")
}

/// `wss://host/api/v1/ws/threads/{id}` bound to `thread_id`.
#[must_use]
#[allow(clippy::missing_panics_doc)]
pub fn thread_endpoint(thread_id: &str) -> Endpoint {
    Endpoint::new(TEST_ORIGIN, "/api/v1/ws/threads/{id}")
        .expect("fixture endpoint is valid")
        .with_param(thread_id)
}

/// Wire text of a `session_started` frame for `session_id`.
#[must_use]
pub fn session_started_json(session_id: &str) -> String {
    serde_json::json!({
        "type": "session_started",
        "session": { "id": session_id },
    })
    .to_string()
}

/// JSON response with a `content-type` header.
#[must_use]
pub fn json_response(status: u16, body: &Value) -> HttpResponse {
    let mut response = HttpResponse::new(status, body.to_string());
    response
        .headers
        .push(("content-type".to_owned(), "application/json".to_owned()));
    response
}
