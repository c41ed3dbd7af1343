//! Tether Request - resilient request/response calls.
//!
//! [`ResilientRequest`] wraps an [`HttpTransport`](tether_core::HttpTransport)
//! with three layers, applied in this order on every call:
//!
//! 1. an optional read-through [`ResponseCache`] keyed by [`RequestSignature`]
//! 2. a [`MinIntervalGate`] that spaces transmissions across all callers
//! 3. linear retry with a longer wait after HTTP 429
//!
//! A call either returns the first 2xx response or fails with
//! [`RequestError::Exhausted`] once the attempt budget is spent.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod cache;
pub mod error;
pub mod rate_limit;
pub mod request;
pub mod signature;
pub mod transport;

pub use cache::{CacheEntry, DEFAULT_CACHE_CAPACITY, ResponseCache};
pub use error::{AttemptError, RequestError, RequestResult};
pub use rate_limit::MinIntervalGate;
pub use request::{
    CachePolicy, DEFAULT_RATE_LIMIT_INTERVAL, RequestConfig, RequestDescriptor, ResilientRequest,
};
pub use signature::RequestSignature;
pub use transport::ReqwestTransport;
