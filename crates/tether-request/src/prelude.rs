//! Prelude module - commonly used types for convenient import.
//!
//! Use `use tether_request::prelude::*;` to import all essential types.

pub use crate::{
    AttemptError, CachePolicy, RequestConfig, RequestDescriptor, RequestError, RequestResult,
    RequestSignature, ResilientRequest, ReqwestTransport,
};
