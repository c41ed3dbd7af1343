//! The reconnecting channel.
//!
//! ```text
//!            open()                 handshake ok
//!   Idle ──────────▶ Connecting ──────────────────▶ Open
//!                     ▲      │ handshake failed      │ lost (not 1000)
//!        after delay  │      ▼                       ▼
//!                   Reconnecting ◀───────────────────┘
//!                          │ budget spent
//!                          ▼
//!                        Failed          close() / server 1000 ──▶ Closed
//! ```

mod driver;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tether_core::{
    ConnectionState, Connector, CredentialProvider, Endpoint, Frame, FrameSink, NoCredentials,
    ReconnectBackoff, SendError, StateChange, TransportError,
};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use self::driver::{Command, Driver};
use crate::dispatcher::{Dispatcher, SubscriberResult, SubscriptionId};
use crate::error::{ChannelError, ChannelResult};
use crate::listeners::{ListenerId, StateListeners};
use crate::lock;
use crate::transport::WsConnector;

/// Default interval between heartbeat pings.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Default limit for a single handshake.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default limit for sending the close frame on `close()`.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

const COMMAND_BUFFER: usize = 64;

/// Channel tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Reconnect delays and attempt budget.
    pub reconnect: ReconnectBackoff,
    /// Interval between heartbeat pings while open. Zero disables them.
    pub heartbeat_interval: Duration,
    /// Limit for one handshake; exceeding it counts as a failed handshake.
    pub handshake_timeout: Duration,
    /// Limit for the best-effort close frame sent by `close()`.
    pub close_timeout: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            reconnect: ReconnectBackoff::default(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }
}

struct Failure {
    attempts: u32,
    error: Arc<TransportError>,
}

/// State shared between the handle and its driver.
pub(crate) struct Shared {
    state: watch::Sender<ConnectionState>,
    listeners: StateListeners,
    failure: Mutex<Option<Failure>>,
}

impl Shared {
    fn new() -> Self {
        let (state, _) = watch::channel(ConnectionState::Idle);
        Self {
            state,
            listeners: StateListeners::default(),
            failure: Mutex::new(None),
        }
    }

    fn current(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub(crate) fn set_state(&self, to: ConnectionState) {
        let from = self.state.send_replace(to);
        if from != to {
            debug!(%from, %to, "Channel state changed");
            self.listeners.notify(StateChange { from, to });
        }
    }

    /// Handshake succeeded: any earlier failure no longer applies.
    fn connected(&self) {
        lock(&self.failure).take();
        self.set_state(ConnectionState::Open);
    }

    fn fail(&self, attempts: u32, error: TransportError) {
        *lock(&self.failure) = Some(Failure {
            attempts,
            error: Arc::new(error),
        });
        self.set_state(ConnectionState::Failed);
    }

    fn connection_failed(&self) -> ChannelError {
        match lock(&self.failure).as_ref() {
            Some(failure) => ChannelError::ConnectionFailed {
                attempts: failure.attempts,
                source: Arc::clone(&failure.error),
            },
            None => ChannelError::Closed,
        }
    }
}

struct DriverHandle {
    commands: mpsc::Sender<Command>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct DriverSlot {
    handle: Option<DriverHandle>,
    closed: bool,
}

/// One logical duplex connection to an [`Endpoint`].
///
/// The channel reconnects on its own after unexpected closures and keeps
/// the same [`Dispatcher`] across sockets, so subscriptions survive
/// reconnects. It must be opened from within a tokio runtime.
pub struct Channel {
    endpoint: Endpoint,
    config: ChannelConfig,
    connector: Arc<dyn Connector>,
    credentials: Arc<dyn CredentialProvider>,
    dispatcher: Arc<Dispatcher>,
    shared: Arc<Shared>,
    driver: Mutex<DriverSlot>,
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("endpoint", &self.endpoint)
            .field("state", &self.state())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Channel {
    /// Create an idle channel that connects through `connector`.
    #[must_use]
    pub fn new(endpoint: Endpoint, connector: Arc<dyn Connector>) -> Self {
        Self {
            endpoint,
            config: ChannelConfig::default(),
            connector,
            credentials: Arc::new(NoCredentials),
            dispatcher: Arc::new(Dispatcher::new()),
            shared: Arc::new(Shared::new()),
            driver: Mutex::new(DriverSlot::default()),
        }
    }

    /// Create an idle channel over a real WebSocket.
    #[must_use]
    pub fn websocket(endpoint: Endpoint) -> Self {
        Self::new(endpoint, Arc::new(WsConnector))
    }

    /// Replace the default tuning.
    #[must_use]
    pub fn with_config(mut self, config: ChannelConfig) -> Self {
        self.config = config;
        self
    }

    /// Supply the query token for every handshake.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Share an existing dispatcher.
    #[must_use]
    pub fn with_dispatcher(mut self, dispatcher: Arc<Dispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// The endpoint this channel connects to.
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Start connecting.
    ///
    /// Does nothing if the channel is already connecting, open or waiting to
    /// reconnect. From `Idle` or `Failed` a fresh driver is started with a
    /// full reconnect budget.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Closed`] after [`close`](Self::close) or a
    /// normal server close, and [`ChannelError::Endpoint`] if the endpoint
    /// cannot be resolved.
    pub fn open(&self) -> ChannelResult<()> {
        let mut slot = lock(&self.driver);
        let state = self.state();
        if slot.closed || state == ConnectionState::Closed {
            return Err(ChannelError::Closed);
        }
        if state.is_active() {
            debug!(%state, "open() ignored; channel already active");
            return Ok(());
        }

        self.endpoint.resolve(None)?;

        let cancel = CancellationToken::new();
        let (commands, rx) = mpsc::channel(COMMAND_BUFFER);
        let driver = Driver {
            endpoint: self.endpoint.clone(),
            config: self.config,
            connector: Arc::clone(&self.connector),
            credentials: Arc::clone(&self.credentials),
            dispatcher: Arc::clone(&self.dispatcher),
            shared: Arc::clone(&self.shared),
            commands: rx,
            cancel: cancel.clone(),
        };

        self.shared.set_state(ConnectionState::Connecting);
        let task = tokio::spawn(driver.run());
        slot.handle = Some(DriverHandle {
            commands,
            cancel,
            task,
        });
        info!(path = %self.endpoint.path_template(), "Channel opening");
        Ok(())
    }

    /// Send a frame over the open connection.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::NotOpen`] unless the channel is open, and
    /// [`SendError::Transport`] if the socket write fails.
    pub async fn send(&self, frame: Frame) -> Result<(), SendError> {
        let state = self.state();
        if state != ConnectionState::Open {
            return Err(SendError::NotOpen(state));
        }

        let commands = lock(&self.driver)
            .handle
            .as_ref()
            .map(|handle| handle.commands.clone())
            .ok_or(SendError::NotOpen(state))?;

        let (reply, result) = oneshot::channel();
        commands
            .send(Command::Send { frame, reply })
            .await
            .map_err(|_| SendError::Disconnected)?;
        result.await.map_err(|_| SendError::Disconnected)?
    }

    /// Close the channel for good.
    ///
    /// Stops the driver and waits for it to exit, sending a normal close
    /// frame if a socket was open. No reconnect or heartbeat timer fires
    /// after this returns. Calling it again is a no-op.
    pub async fn close(&self) {
        let handle = {
            let mut slot = lock(&self.driver);
            if slot.closed {
                return;
            }
            slot.closed = true;
            slot.handle.take()
        };

        if let Some(handle) = handle {
            handle.cancel.cancel();
            if let Err(err) = handle.task.await {
                warn!(error = %err, "Channel driver ended abnormally");
            }
        }

        self.shared.set_state(ConnectionState::Closed);
        info!(path = %self.endpoint.path_template(), "Channel closed");
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.shared.current()
    }

    /// Receiver that observes every state change.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Wait until the channel is open.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::ConnectionFailed`] if the channel gives up
    /// reconnecting and [`ChannelError::Closed`] if it is closed first.
    pub async fn wait_until_open(&self) -> ChannelResult<()> {
        let mut rx = self.watch_state();
        let state = *rx
            .wait_for(|state| {
                matches!(
                    state,
                    ConnectionState::Open | ConnectionState::Closed | ConnectionState::Failed
                )
            })
            .await
            .map_err(|_| ChannelError::Closed)?;

        match state {
            ConnectionState::Open => Ok(()),
            ConnectionState::Failed => Err(self.shared.connection_failed()),
            _ => Err(ChannelError::Closed),
        }
    }

    /// Register a state listener.
    pub fn on_state_change<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(StateChange) + Send + Sync + 'static,
    {
        self.shared.listeners.add(listener)
    }

    /// Remove a state listener. Returns `true` if it was registered.
    pub fn remove_state_listener(&self, id: ListenerId) -> bool {
        self.shared.listeners.remove(id)
    }

    /// Subscribe to inbound frames of `frame_type`.
    pub fn on_frame<F>(&self, frame_type: impl Into<String>, callback: F) -> SubscriptionId
    where
        F: Fn(&Frame) -> SubscriberResult + Send + Sync + 'static,
    {
        self.dispatcher.subscribe(frame_type, callback)
    }

    /// The channel's subscriber registry.
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// The failure that last moved the channel to `Failed`.
    #[must_use]
    pub fn last_error(&self) -> Option<Arc<TransportError>> {
        lock(&self.shared.failure)
            .as_ref()
            .map(|failure| Arc::clone(&failure.error))
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.driver).handle.take() {
            handle.cancel.cancel();
        }
    }
}

#[async_trait]
impl FrameSink for Channel {
    async fn send_frame(&self, frame: Frame) -> Result<(), SendError> {
        self.send(frame).await
    }
}
