//! Frame sink that records instead of transmitting.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tether_core::{ConnectionState, Frame, FrameSink, SendError};
use tokio::time::Instant;

use crate::lock;

#[derive(Default)]
struct Recorded {
    frames: Vec<(Frame, Instant)>,
    failing: bool,
}

/// [`FrameSink`] that keeps every frame it is given.
#[derive(Clone, Default)]
pub struct RecordingSender {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingSender {
    /// Empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// While failing, sends are rejected as if the channel were reconnecting
    /// and nothing is recorded.
    pub fn set_failing(&self, failing: bool) {
        lock(&self.inner).failing = failing;
    }

    /// Frames recorded so far.
    #[must_use]
    pub fn frames(&self) -> Vec<Frame> {
        lock(&self.inner)
            .frames
            .iter()
            .map(|(frame, _)| frame.clone())
            .collect()
    }

    /// Types of the frames recorded so far.
    #[must_use]
    pub fn types(&self) -> Vec<String> {
        lock(&self.inner)
            .frames
            .iter()
            .map(|(frame, _)| frame.frame_type.clone())
            .collect()
    }

    /// When each frame of `frame_type` was sent.
    #[must_use]
    pub fn sent_at(&self, frame_type: &str) -> Vec<Instant> {
        lock(&self.inner)
            .frames
            .iter()
            .filter(|(frame, _)| frame.is(frame_type))
            .map(|(_, at)| *at)
            .collect()
    }

    /// Forget everything recorded.
    pub fn clear(&self) {
        lock(&self.inner).frames.clear();
    }
}

#[async_trait]
impl FrameSink for RecordingSender {
    async fn send_frame(&self, frame: Frame) -> Result<(), SendError> {
        let mut recorded = lock(&self.inner);
        if recorded.failing {
            return Err(SendError::NotOpen(ConnectionState::Reconnecting));
        }
        recorded.frames.push((frame, Instant::now()));
        Ok(())
    }
}
