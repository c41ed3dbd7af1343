//! Prelude module - commonly used types for convenient import.
//!
//! Use `use tether_channel::prelude::*;` to import all essential types.

pub use crate::{
    Channel, ChannelConfig, ChannelError, ChannelResult, DispatchOutcome, Dispatcher, ListenerId,
    SubscriberResult, SubscriptionId, TypingCoordinator, WsConnector,
};
