//! Tether Test - Shared test utilities for the Tether crates.
//!
//! This crate provides mock transports and fixtures that can be used across
//! the workspace as a dev-dependency.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! tether-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! #[tokio::test(start_paused = true)]
//! async fn discovery_frames_reach_subscribers() {
//!     let (connector, mut sockets) = MockConnector::new();
//!     let channel = Channel::new(discovery_endpoint(), Arc::new(connector));
//!     channel.open().unwrap();
//!
//!     let socket = sockets.next().await.unwrap();
//!     socket.send_text(session_started_json("s1"));
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod harness;
pub mod mock_http;
pub mod mock_socket;
pub mod recording;

pub use fixtures::*;
pub use harness::*;
pub use mock_http::*;
pub use mock_socket::*;
pub use recording::*;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the data if a panicking test poisoned it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
