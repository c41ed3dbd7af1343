//! Tether Telemetry - logging setup for the Tether client.
//!
//! Library crates only emit `tracing` events; binaries call
//! [`setup_logging`] once at startup to decide where they go.
//!
//! # Example
//!
//! ```rust,no_run
//! use tether_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), tether_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("tether_channel=debug");
//! setup_logging(&config)?;
//! tracing::info!("ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};
