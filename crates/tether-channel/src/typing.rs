//! Debounced typing indicators.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tether_core::{Frame, FrameSink, SendError};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::lock;

/// Quiet period after the last activity before `typing_stop` is sent.
pub const DEFAULT_TYPING_DEBOUNCE: Duration = Duration::from_secs(3);

#[derive(Default)]
struct TypingState {
    is_typing: bool,
    /// Bumped whenever the stop timer is re-armed or cancelled, so a timer
    /// that already woke up can tell it is stale.
    generation: u64,
}

/// Pending stop timer. Kept outside the async state lock so `Drop` can
/// always reach it.
type TimerSlot = Arc<std::sync::Mutex<Option<JoinHandle<()>>>>;

/// Turns bursts of local activity into a `typing_start` / `typing_stop`
/// pair.
///
/// The first activity sends `typing_start`. Every activity pushes the stop
/// deadline out by the debounce period; when it passes, `typing_stop` is
/// sent. Send failures are logged and returned, but the typing state still
/// changes.
pub struct TypingCoordinator {
    sink: Arc<dyn FrameSink>,
    debounce: Duration,
    context: Option<Value>,
    state: Arc<Mutex<TypingState>>,
    timer: TimerSlot,
}

impl std::fmt::Debug for TypingCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypingCoordinator")
            .field("debounce", &self.debounce)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl TypingCoordinator {
    /// Coordinator with the default debounce and no context payload.
    #[must_use]
    pub fn new(sink: Arc<dyn FrameSink>) -> Self {
        Self {
            sink,
            debounce: DEFAULT_TYPING_DEBOUNCE,
            context: None,
            state: Arc::new(Mutex::new(TypingState::default())),
            timer: TimerSlot::default(),
        }
    }

    /// Set the quiet period before `typing_stop`.
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Attach `context` (for example `{"thread_id": "t1"}`) to both frames.
    #[must_use]
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    /// Record local activity.
    ///
    /// # Errors
    ///
    /// Returns the send error if `typing_start` could not be sent.
    pub async fn notify_activity(&self) -> Result<(), SendError> {
        let mut state = self.state.lock().await;

        let result = if state.is_typing {
            Ok(())
        } else {
            state.is_typing = true;
            debug!("Typing started");
            let result = self
                .sink
                .send_frame(Frame::typing_start(self.context.clone()))
                .await;
            if let Err(err) = &result {
                warn!(error = %err, "Failed to send typing_start");
            }
            result
        };

        self.arm_stop_timer(&mut state);
        result
    }

    /// Stop typing now. Does nothing if not typing.
    ///
    /// # Errors
    ///
    /// Returns the send error if `typing_stop` could not be sent.
    pub async fn stop(&self) -> Result<(), SendError> {
        let mut state = self.state.lock().await;
        if !state.is_typing {
            return Ok(());
        }

        self.cancel_timer();
        state.generation = state.generation.wrapping_add(1);
        state.is_typing = false;
        debug!("Typing stopped");

        let result = self
            .sink
            .send_frame(Frame::typing_stop(self.context.clone()))
            .await;
        if let Err(err) = &result {
            warn!(error = %err, "Failed to send typing_stop");
        }
        result
    }

    /// Whether a `typing_start` is outstanding.
    pub async fn is_typing(&self) -> bool {
        self.state.lock().await.is_typing
    }

    fn cancel_timer(&self) {
        if let Some(timer) = lock(&self.timer).take() {
            timer.abort();
        }
    }

    fn arm_stop_timer(&self, state: &mut TypingState) {
        self.cancel_timer();
        state.generation = state.generation.wrapping_add(1);
        let generation = state.generation;

        let shared = Arc::clone(&self.state);
        let slot = Arc::clone(&self.timer);
        let sink = Arc::clone(&self.sink);
        let context = self.context.clone();
        let debounce = self.debounce;

        let timer = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;

            let mut state = shared.lock().await;
            if state.generation != generation || !state.is_typing {
                return;
            }
            state.is_typing = false;
            lock(&slot).take();
            debug!("Typing stopped after inactivity");

            if let Err(err) = sink.send_frame(Frame::typing_stop(context)).await {
                warn!(error = %err, "Failed to send typing_stop");
            }
        });
        *lock(&self.timer) = Some(timer);
    }
}

impl Drop for TypingCoordinator {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tether_core::frame_type;
    use tether_test::RecordingSender;
    use tokio::time::Instant;

    fn coordinator(sender: &RecordingSender) -> TypingCoordinator {
        TypingCoordinator::new(Arc::new(sender.clone()))
    }

    #[tokio::test(start_paused = true)]
    async fn burst_sends_one_start_and_a_trailing_stop() {
        let sender = RecordingSender::new();
        let typing = coordinator(&sender);
        let start = Instant::now();

        typing.notify_activity().await.unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;
        typing.notify_activity().await.unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;
        typing.notify_activity().await.unwrap();

        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(sender.types(), ["typing_start", "typing_stop"]);
        let stopped = sender.sent_at(frame_type::TYPING_STOP)[0].duration_since(start);
        assert!(stopped >= Duration::from_millis(3800));
        assert!(stopped < Duration::from_millis(3900));
        assert!(!typing.is_typing().await);
    }

    #[tokio::test(start_paused = true)]
    async fn no_stop_before_quiet_period() {
        let sender = RecordingSender::new();
        let typing = coordinator(&sender);

        typing.notify_activity().await.unwrap();
        tokio::time::sleep(Duration::from_millis(2900)).await;
        assert_eq!(sender.types(), ["typing_start"]);
        assert!(typing.is_typing().await);
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_stop_cancels_timer() {
        let sender = RecordingSender::new();
        let typing = coordinator(&sender);

        typing.notify_activity().await.unwrap();
        typing.stop().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(sender.types(), ["typing_start", "typing_stop"]);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_when_idle_is_a_noop() {
        let sender = RecordingSender::new();
        let typing = coordinator(&sender);
        typing.stop().await.unwrap();
        assert!(sender.types().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn context_is_attached_to_both_frames() {
        let sender = RecordingSender::new();
        let typing = coordinator(&sender).with_context(json!({"thread_id": "t1"}));

        typing.notify_activity().await.unwrap();
        typing.stop().await.unwrap();

        for frame in sender.frames() {
            assert_eq!(frame.payload, json!({"thread_id": "t1"}));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_send_still_changes_state() {
        let sender = RecordingSender::new();
        sender.set_failing(true);
        let typing = coordinator(&sender);

        assert!(typing.notify_activity().await.is_err());
        assert!(typing.is_typing().await);

        assert!(typing.stop().await.is_err());
        assert!(!typing.is_typing().await);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels_timer_while_state_is_busy() {
        let sender = RecordingSender::new();
        let typing = coordinator(&sender);
        typing.notify_activity().await.unwrap();

        let busy = Arc::clone(&typing.state).lock_owned().await;
        drop(typing);
        drop(busy);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(sender.types(), ["typing_start"]);
    }

    #[tokio::test(start_paused = true)]
    async fn typing_resumes_after_stop() {
        let sender = RecordingSender::new();
        let typing = coordinator(&sender).with_debounce(Duration::from_secs(1));

        typing.notify_activity().await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        typing.notify_activity().await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(
            sender.types(),
            ["typing_start", "typing_stop", "typing_start", "typing_stop"]
        );
    }
}
