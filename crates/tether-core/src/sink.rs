//! Outbound frame contract.

use async_trait::async_trait;

use crate::error::SendError;
use crate::frame::Frame;

/// Anything frames can be sent through.
///
/// Implemented by channels; test doubles implement it to record traffic.
#[async_trait]
pub trait FrameSink: Send + Sync {
    /// Transmit `frame`, reporting whether it was written.
    async fn send_frame(&self, frame: Frame) -> Result<(), SendError>;
}
