//! Scripted socket connector.
//!
//! [`MockConnector`] answers each handshake from a script of
//! [`ConnectOutcome`]s. Every accepted handshake yields a
//! [`MockSocketHandle`] on the paired [`AcceptedSockets`] receiver, through
//! which a test plays the server: pushing inbound text, closing with a code,
//! dropping the connection, and reading what the client wrote.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::{FutureExt, SinkExt, StreamExt};
use serde_json::Value;
use tether_core::{Connector, Frame, Socket, SocketEvent, SocketWrite, TransportError};
use tokio::time::Instant;
use url::Url;

use crate::lock;

/// How the next handshake ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// Complete the handshake.
    Accept,
    /// Fail with a connection-refused error.
    Refuse(String),
    /// Never complete (exercises handshake timeouts).
    Hang,
}

struct ConnectorState {
    script: VecDeque<ConnectOutcome>,
    fallback: ConnectOutcome,
    attempts: Vec<(Url, Instant)>,
    accepted: mpsc::UnboundedSender<MockSocketHandle>,
}

/// Connector that follows a script instead of touching the network.
#[derive(Clone)]
pub struct MockConnector {
    inner: Arc<Mutex<ConnectorState>>,
}

impl MockConnector {
    /// Create a connector that accepts every handshake, plus the receiver
    /// of accepted sockets.
    #[must_use]
    pub fn new() -> (Self, AcceptedSockets) {
        let (accepted, rx) = mpsc::unbounded();
        let connector = Self {
            inner: Arc::new(Mutex::new(ConnectorState {
                script: VecDeque::new(),
                fallback: ConnectOutcome::Accept,
                attempts: Vec::new(),
                accepted,
            })),
        };
        (connector, AcceptedSockets { rx })
    }

    /// Queue outcomes for the next handshakes, in order.
    #[must_use]
    pub fn with_script(self, outcomes: impl IntoIterator<Item = ConnectOutcome>) -> Self {
        lock(&self.inner).script.extend(outcomes);
        self
    }

    /// Outcome used once the script runs out.
    #[must_use]
    pub fn with_fallback(self, outcome: ConnectOutcome) -> Self {
        lock(&self.inner).fallback = outcome;
        self
    }

    /// Queue one more outcome.
    pub fn push(&self, outcome: ConnectOutcome) {
        lock(&self.inner).script.push_back(outcome);
    }

    /// URLs of every handshake attempted so far.
    #[must_use]
    pub fn attempts(&self) -> Vec<Url> {
        lock(&self.inner)
            .attempts
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    /// When each handshake was attempted.
    #[must_use]
    pub fn attempt_times(&self) -> Vec<Instant> {
        lock(&self.inner).attempts.iter().map(|(_, at)| *at).collect()
    }

    /// Number of handshakes attempted so far.
    #[must_use]
    pub fn attempt_count(&self) -> usize {
        lock(&self.inner).attempts.len()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, url: &Url) -> Result<Socket, TransportError> {
        let (outcome, accepted) = {
            let mut state = lock(&self.inner);
            state.attempts.push((url.clone(), Instant::now()));
            let outcome = state
                .script
                .pop_front()
                .unwrap_or_else(|| state.fallback.clone());
            (outcome, state.accepted.clone())
        };

        match outcome {
            ConnectOutcome::Accept => {
                let (socket, handle) = socket_pair(url.clone());
                let _ = accepted.unbounded_send(handle);
                Ok(socket)
            },
            ConnectOutcome::Refuse(message) => Err(TransportError::connect(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                message,
            ))),
            ConnectOutcome::Hang => futures::future::pending().await,
        }
    }
}

/// Receiver of sockets accepted by a [`MockConnector`].
pub struct AcceptedSockets {
    rx: mpsc::UnboundedReceiver<MockSocketHandle>,
}

impl AcceptedSockets {
    /// Wait for the next accepted socket.
    pub async fn next(&mut self) -> Option<MockSocketHandle> {
        self.rx.next().await
    }

    /// Take an already-accepted socket without waiting.
    pub fn try_next(&mut self) -> Option<MockSocketHandle> {
        self.rx.next().now_or_never().flatten()
    }
}

/// Server side of one mock connection.
///
/// Dropping the handle ends the client's read stream, which the client sees
/// as an abnormal closure.
pub struct MockSocketHandle {
    url: Url,
    inbound: mpsc::UnboundedSender<Result<SocketEvent, TransportError>>,
    outbound: mpsc::UnboundedReceiver<SocketWrite>,
}

impl MockSocketHandle {
    /// URL the client connected to.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Deliver a text message. Returns `false` if the client is gone.
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.inbound
            .unbounded_send(Ok(SocketEvent::Text(text.into())))
            .is_ok()
    }

    /// Deliver a JSON value as text.
    pub fn send_json(&self, value: &Value) -> bool {
        self.send_text(value.to_string())
    }

    /// Deliver a frame in its wire encoding.
    pub fn send_frame(&self, frame: &Frame) -> bool {
        self.send_json(&frame.to_value())
    }

    /// Deliver a close frame with `code`.
    pub fn close(&self, code: u16) -> bool {
        self.inbound
            .unbounded_send(Ok(SocketEvent::Closed { code }))
            .is_ok()
    }

    /// Deliver a read error.
    pub fn fail(&self, message: &str) -> bool {
        let err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, message.to_owned());
        self.inbound
            .unbounded_send(Err(TransportError::socket(err)))
            .is_ok()
    }

    /// Wait for the next write from the client.
    pub async fn next_write(&mut self) -> Option<SocketWrite> {
        self.outbound.next().await
    }

    /// Wait for the next text write that decodes as a frame.
    pub async fn next_frame(&mut self) -> Option<Frame> {
        while let Some(write) = self.outbound.next().await {
            if let SocketWrite::Text(text) = write
                && let Ok(frame) = Frame::decode(&text)
            {
                return Some(frame);
            }
        }
        None
    }

    /// Collect every write already made, without waiting.
    pub fn drain_writes(&mut self) -> Vec<SocketWrite> {
        let mut writes = Vec::new();
        while let Some(Some(write)) = self.outbound.next().now_or_never() {
            writes.push(write);
        }
        writes
    }

    /// Frame types among the writes already made.
    pub fn drain_frame_types(&mut self) -> Vec<String> {
        self.drain_writes()
            .into_iter()
            .filter_map(|write| match write {
                SocketWrite::Text(text) => Frame::decode(&text).ok().map(|f| f.frame_type),
                SocketWrite::Close(_) => None,
            })
            .collect()
    }
}

fn socket_pair(url: Url) -> (Socket, MockSocketHandle) {
    let (out_tx, out_rx) = mpsc::unbounded::<SocketWrite>();
    let (in_tx, in_rx) = mpsc::unbounded::<Result<SocketEvent, TransportError>>();

    let socket = Socket::new(
        Box::pin(out_tx.sink_map_err(TransportError::socket)),
        Box::pin(in_rx),
    );
    let handle = MockSocketHandle {
        url,
        inbound: in_tx,
        outbound: out_rx,
    };
    (socket, handle)
}
