//! Loopback servers shared by the integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Message, Utf8Bytes};
use tokio_tungstenite::{WebSocketStream, accept_hdr_async};

/// Upper bound for anything a test waits on.
pub const WAIT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// WebSocket
// ---------------------------------------------------------------------------

/// A WebSocket server on an ephemeral loopback port.
pub struct WsServer {
    addr: SocketAddr,
    conns: mpsc::UnboundedReceiver<ServerConn>,
    task: JoinHandle<()>,
}

impl WsServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let (tx, conns) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let tx = tx.clone();
                tokio::spawn(async move {
                    let mut uri = String::new();
                    let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                        uri = req.uri().to_string();
                        Ok(resp)
                    };
                    if let Ok(ws) = accept_hdr_async(stream, callback).await {
                        let _ = tx.send(ServerConn { uri, ws });
                    }
                });
            }
        });

        Self { addr, conns, task }
    }

    /// `ws://` origin for an [`Endpoint`](tether_core::Endpoint).
    pub fn origin(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// The next accepted connection.
    pub async fn accept(&mut self) -> ServerConn {
        tokio::time::timeout(WAIT, self.conns.recv())
            .await
            .expect("timed out waiting for a connection")
            .expect("server stopped")
    }

    /// Whether another connection arrives within `within`.
    pub async fn accepts_within(&mut self, within: Duration) -> bool {
        tokio::time::timeout(within, self.conns.recv())
            .await
            .is_ok_and(|conn| conn.is_some())
    }
}

impl Drop for WsServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Server side of one accepted connection.
pub struct ServerConn {
    /// Request target of the handshake, query included.
    pub uri: String,
    ws: WebSocketStream<TcpStream>,
}

impl ServerConn {
    pub async fn send_json(&mut self, value: &Value) {
        self.ws
            .send(Message::text(value.to_string()))
            .await
            .expect("server send");
    }

    /// Next text message, parsed as JSON.
    pub async fn next_json(&mut self) -> Value {
        tokio::time::timeout(WAIT, async {
            loop {
                match self.ws.next().await {
                    Some(Ok(Message::Text(text))) => {
                        return serde_json::from_str(text.as_str()).expect("client sent JSON");
                    },
                    Some(Ok(_)) => {},
                    other => panic!("connection ended while waiting for text: {other:?}"),
                }
            }
        })
        .await
        .expect("timed out waiting for a client message")
    }

    /// Next frame whose `type` is `frame_type`, skipping others.
    pub async fn next_of_type(&mut self, frame_type: &str) -> Value {
        loop {
            let value = self.next_json().await;
            if value["type"] == frame_type {
                return value;
            }
        }
    }

    /// Wait for the client's close frame and return its code.
    pub async fn next_close_code(&mut self) -> Option<u16> {
        tokio::time::timeout(WAIT, async {
            loop {
                match self.ws.next().await {
                    Some(Ok(Message::Close(frame))) => return frame.map(|f| u16::from(f.code)),
                    Some(Ok(_)) => {},
                    _ => return None,
                }
            }
        })
        .await
        .expect("timed out waiting for close")
    }

    /// Close with a close frame that carries no status code.
    pub async fn close_without_status(mut self) {
        let _ = self.ws.close(None).await;
    }

    /// Close with `code`.
    pub async fn close(mut self, code: u16) {
        let _ = self
            .ws
            .close(Some(CloseFrame {
                code: CloseCode::from(code),
                reason: Utf8Bytes::from_static("test"),
            }))
            .await;
    }
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// Minimal HTTP/1.1 server answering from a script.
///
/// Each connection carries one request. The last scripted response repeats.
pub struct HttpStub {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
    task: JoinHandle<()>,
}

impl HttpStub {
    pub async fn start(script: Vec<(u16, &'static str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&requests);
        let task = tokio::spawn(async move {
            let mut served: usize = 0;
            while let Ok((mut stream, _)) = listener.accept().await {
                let Some(head) = read_request(&mut stream).await else {
                    continue;
                };
                let index = served.min(script.len().saturating_sub(1));
                served = served.saturating_add(1);
                recorded.lock().expect("lock").push(head);

                let (status, body) = script.get(index).copied().unwrap_or((200, "{}"));
                let response = format!(
                    "HTTP/1.1 {status} STUB\r\nContent-Type: application/json\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        Self {
            addr,
            requests,
            task,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Request heads received so far, lowercased.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("lock").clone()
    }

    pub fn hits(&self) -> usize {
        self.requests.lock().expect("lock").len()
    }
}

impl Drop for HttpStub {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Read one request, returning its lowercased head. The body is consumed.
async fn read_request(stream: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let head_end = loop {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos.saturating_add(4);
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_lowercase();
    let content_length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut body_read = buf.len().saturating_sub(head_end);
    while body_read < content_length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body_read = body_read.saturating_add(n);
    }

    Some(head)
}
