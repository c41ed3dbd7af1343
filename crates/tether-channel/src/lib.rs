//! Tether Channel - a reconnecting duplex connection with typed dispatch.
//!
//! A [`Channel`] owns one logical connection to an [`Endpoint`]. It opens the
//! socket, reconnects with exponential backoff when the connection drops,
//! sends a heartbeat `ping` while open, and hands every decoded inbound
//! [`Frame`] to its [`Dispatcher`]. Callers only see lifecycle notifications
//! and frames; sockets come and go underneath.
//!
//! The [`TypingCoordinator`] sits on top of any [`FrameSink`] and turns bursts
//! of local activity into one `typing_start` / `typing_stop` pair.
//!
//! [`Endpoint`]: tether_core::Endpoint
//! [`Frame`]: tether_core::Frame
//! [`FrameSink`]: tether_core::FrameSink

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod channel;
pub mod dispatcher;
pub mod error;
mod heartbeat;
pub mod listeners;
pub mod transport;
pub mod typing;

pub use channel::{Channel, ChannelConfig};
pub use dispatcher::{
    DispatchOutcome, Dispatcher, SubscriberError, SubscriberResult, SubscriptionId,
};
pub use error::{ChannelError, ChannelResult};
pub use listeners::{ListenerId, StateListeners};
pub use transport::WsConnector;
pub use typing::{DEFAULT_TYPING_DEBOUNCE, TypingCoordinator};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a std mutex, recovering the data if a panicking holder poisoned it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
