//! Scripted HTTP transport.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tether_core::{HttpResponse, HttpTransport, OutboundRequest, TransportError};
use tokio::time::Instant;

use crate::{json_response, lock};

/// A request seen by [`MockHttpTransport`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// The request as sent.
    pub request: OutboundRequest,
    /// When it arrived.
    pub at: Instant,
}

enum Reply {
    Response(HttpResponse),
    Error(String),
}

struct HttpState {
    script: VecDeque<Reply>,
    fallback: HttpResponse,
    requests: Vec<RecordedRequest>,
}

/// HTTP transport that replays queued responses and records every request.
///
/// Once the queue is empty every request gets the fallback response
/// (`200 {}` unless changed).
#[derive(Clone)]
pub struct MockHttpTransport {
    inner: Arc<Mutex<HttpState>>,
}

impl Default for MockHttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHttpTransport {
    /// Empty script, `200 {}` fallback.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HttpState {
                script: VecDeque::new(),
                fallback: HttpResponse::new(200, "{}"),
                requests: Vec::new(),
            })),
        }
    }

    /// Queue a response with a raw body.
    #[must_use]
    pub fn with_response(self, status: u16, body: impl Into<String>) -> Self {
        self.push_response(HttpResponse::new(status, body));
        self
    }

    /// Queue a JSON response.
    #[must_use]
    pub fn with_json(self, status: u16, body: &Value) -> Self {
        self.push_response(json_response(status, body));
        self
    }

    /// Queue a transport-level failure.
    #[must_use]
    pub fn with_transport_error(self, message: impl Into<String>) -> Self {
        lock(&self.inner)
            .script
            .push_back(Reply::Error(message.into()));
        self
    }

    /// Response used once the queue runs out.
    #[must_use]
    pub fn with_fallback(self, response: HttpResponse) -> Self {
        lock(&self.inner).fallback = response;
        self
    }

    /// Queue one more response.
    pub fn push_response(&self, response: HttpResponse) {
        lock(&self.inner)
            .script
            .push_back(Reply::Response(response));
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.inner).requests.clone()
    }

    /// Number of requests received so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        lock(&self.inner).requests.len()
    }

    /// Arrival times of every request.
    #[must_use]
    pub fn sent_at(&self) -> Vec<Instant> {
        lock(&self.inner).requests.iter().map(|r| r.at).collect()
    }
}

#[async_trait]
impl HttpTransport for MockHttpTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<HttpResponse, TransportError> {
        let mut state = lock(&self.inner);
        state.requests.push(RecordedRequest {
            request: request.clone(),
            at: Instant::now(),
        });
        match state.script.pop_front() {
            Some(Reply::Response(response)) => Ok(response),
            Some(Reply::Error(message)) => Err(TransportError::Http(message.into())),
            None => Ok(state.fallback.clone()),
        }
    }
}
