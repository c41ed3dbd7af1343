//! The per-channel driver task.
//!
//! One driver owns the socket, the heartbeat timer and the reconnect timer
//! for the lifetime of an `open()`. It is the only writer of channel state
//! and the only writer to the socket; caller sends reach it as commands.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tether_core::socket::{ABNORMAL_CLOSURE, NORMAL_CLOSURE};
use tether_core::{
    ConnectionState, Connector, CredentialProvider, Endpoint, Frame, SendError, Socket,
    SocketEvent, SocketSink, SocketWrite, TransportError, frame_type,
};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::{ChannelConfig, Shared};
use crate::dispatcher::Dispatcher;
use crate::heartbeat::Heartbeat;

/// Work handed to the driver by the public handle.
pub(super) enum Command {
    Send {
        frame: Frame,
        reply: oneshot::Sender<Result<(), SendError>>,
    },
}

impl Command {
    fn reject(self, state: ConnectionState) {
        match self {
            Self::Send { reply, .. } => {
                let _ = reply.send(Err(SendError::NotOpen(state)));
            },
        }
    }
}

enum Handshake {
    Connected(Socket),
    Failed(TransportError),
    Cancelled,
}

/// How an open session ended.
enum SessionEnd {
    Cancelled,
    ClosedByPeer,
    Lost(TransportError),
}

pub(super) struct Driver {
    pub(super) endpoint: Endpoint,
    pub(super) config: ChannelConfig,
    pub(super) connector: Arc<dyn Connector>,
    pub(super) credentials: Arc<dyn CredentialProvider>,
    pub(super) dispatcher: Arc<Dispatcher>,
    pub(super) shared: Arc<Shared>,
    pub(super) commands: mpsc::Receiver<Command>,
    pub(super) cancel: CancellationToken,
}

impl Driver {
    /// Connect, serve, and reconnect until cancelled, closed by the peer, or
    /// out of reconnect attempts.
    pub(super) async fn run(mut self) {
        let mut attempt: u32 = 0;

        loop {
            self.shared.set_state(ConnectionState::Connecting);

            let failure = match self.handshake().await {
                Handshake::Cancelled => return,
                Handshake::Connected(socket) => {
                    attempt = 0;
                    self.shared.connected();
                    info!(path = %self.endpoint.path_template(), "Channel connected");

                    match self.serve(socket).await {
                        SessionEnd::Cancelled => return,
                        SessionEnd::ClosedByPeer => {
                            info!("Server closed the channel normally");
                            self.shared.set_state(ConnectionState::Closed);
                            return;
                        },
                        SessionEnd::Lost(err) => err,
                    }
                },
                Handshake::Failed(err) => {
                    warn!(attempt, error = %err, "Handshake failed");
                    err
                },
            };

            let next = attempt.saturating_add(1);
            if !self.config.reconnect.should_retry(next) {
                error!(
                    attempts = attempt,
                    error = %failure,
                    "Reconnect attempts exhausted"
                );
                self.shared.fail(attempt, failure);
                return;
            }
            attempt = next;

            let delay = self.config.reconnect.delay(attempt);
            self.shared.set_state(ConnectionState::Reconnecting);
            info!(
                delay_ms = delay.as_millis(),
                attempt,
                max_attempts = self.config.reconnect.max_attempts,
                "Reconnecting after backoff"
            );

            if !self.wait(delay).await {
                return;
            }
        }
    }

    /// One handshake, bounded by the handshake timeout.
    async fn handshake(&mut self) -> Handshake {
        let connector = Arc::clone(&self.connector);
        let credentials = Arc::clone(&self.credentials);
        let endpoint = self.endpoint.clone();
        let limit = self.config.handshake_timeout;

        let attempt = tokio::time::timeout(
            limit,
            connect_once(connector.as_ref(), credentials.as_ref(), &endpoint),
        );
        tokio::pin!(attempt);

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Handshake::Cancelled,
                Some(command) = self.commands.recv() => {
                    command.reject(ConnectionState::Connecting);
                }
                result = &mut attempt => {
                    return match result {
                        Ok(Ok(socket)) => Handshake::Connected(socket),
                        Ok(Err(err)) => Handshake::Failed(err),
                        Err(_) => Handshake::Failed(TransportError::HandshakeTimeout(limit)),
                    };
                }
            }
        }
    }

    /// Serve an open socket until it ends or the driver is cancelled.
    async fn serve(&mut self, socket: Socket) -> SessionEnd {
        let Socket {
            mut sink,
            mut stream,
        } = socket;
        let mut heartbeat = Heartbeat::start(self.config.heartbeat_interval);

        loop {
            tokio::select! {
                biased;

                () = self.cancel.cancelled() => {
                    self.close_socket(&mut sink).await;
                    return SessionEnd::Cancelled;
                }

                Some(command) = self.commands.recv() => match command {
                    Command::Send { frame, reply } => {
                        let result = write_frame(&mut sink, &frame).await;
                        if let Err(err) = &result {
                            warn!(frame_type = %frame.frame_type, error = %err, "Send failed");
                        }
                        let _ = reply.send(result);
                    },
                },

                event = stream.next() => match event {
                    Some(Ok(SocketEvent::Text(text))) => self.on_text(&mut sink, &text).await,
                    Some(Ok(SocketEvent::Closed { code })) if code == NORMAL_CLOSURE => {
                        return SessionEnd::ClosedByPeer;
                    },
                    Some(Ok(SocketEvent::Closed { code })) => {
                        warn!(code, "Connection closed abnormally");
                        return SessionEnd::Lost(TransportError::Closed(code));
                    },
                    Some(Err(err)) => {
                        warn!(error = %err, "Socket read error");
                        return SessionEnd::Lost(err);
                    },
                    None => {
                        warn!("Socket stream ended");
                        return SessionEnd::Lost(TransportError::Closed(ABNORMAL_CLOSURE));
                    },
                },

                () = heartbeat.tick() => {
                    trace!("Sending heartbeat ping");
                    if let Err(err) = write_frame(&mut sink, &Frame::ping()).await {
                        warn!(error = %err, "Heartbeat ping failed");
                    }
                }
            }
        }
    }

    async fn on_text(&self, sink: &mut SocketSink, text: &str) {
        let frame = match Frame::decode(text) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(error = %err, len = text.len(), "Dropping malformed frame");
                return;
            },
        };

        if frame.is(frame_type::PING)
            && let Err(err) = write_frame(sink, &Frame::pong()).await
        {
            warn!(error = %err, "Failed to answer ping");
        }

        let outcome = self.dispatcher.dispatch(&frame);
        trace!(
            frame_type = %frame.frame_type,
            delivered = outcome.delivered,
            failed = outcome.failed,
            "Frame dispatched"
        );
    }

    async fn close_socket(&self, sink: &mut SocketSink) {
        let close = sink.send(SocketWrite::Close(NORMAL_CLOSURE));
        match tokio::time::timeout(self.config.close_timeout, close).await {
            Ok(Ok(())) => debug!("Close frame sent"),
            Ok(Err(err)) => debug!(error = %err, "Close frame not sent"),
            Err(_) => debug!("Timed out sending close frame"),
        }
    }

    /// Sleep out a backoff delay. Returns `false` if cancelled first.
    async fn wait(&mut self, delay: Duration) -> bool {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return false,
                Some(command) = self.commands.recv() => {
                    command.reject(ConnectionState::Reconnecting);
                }
                () = &mut sleep => return true,
            }
        }
    }
}

async fn connect_once(
    connector: &dyn Connector,
    credentials: &dyn CredentialProvider,
    endpoint: &Endpoint,
) -> Result<Socket, TransportError> {
    let token = credentials.query_token().await?;
    let url = endpoint.resolve(token.as_deref())?;
    debug!(
        host = url.host_str().unwrap_or_default(),
        path = url.path(),
        "Connecting"
    );
    connector.connect(&url).await
}

async fn write_frame(sink: &mut SocketSink, frame: &Frame) -> Result<(), SendError> {
    let text = frame.encode()?;
    sink.send(SocketWrite::Text(text)).await?;
    Ok(())
}
