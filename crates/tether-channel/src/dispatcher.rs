//! Frame type to subscriber fan-out.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tether_core::Frame;
use tracing::{debug, trace, warn};

/// Error a subscriber callback may return.
pub type SubscriberError = Box<dyn std::error::Error + Send + Sync>;

/// Result returned by subscriber callbacks.
pub type SubscriberResult = Result<(), SubscriberError>;

type Callback = Arc<dyn Fn(&Frame) -> SubscriberResult + Send + Sync>;

/// Handle for removing a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    frame_type: String,
    callback: Callback,
}

/// What happened when a frame was dispatched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Callbacks that returned `Ok`.
    pub delivered: usize,
    /// Callbacks that returned `Err` or panicked.
    pub failed: usize,
}

impl DispatchOutcome {
    /// Whether no subscriber matched the frame.
    #[must_use]
    pub const fn unmatched(&self) -> bool {
        self.delivered == 0 && self.failed == 0
    }
}

/// Registry of frame subscribers keyed by frame type.
///
/// Callbacks for a type run in registration order. A failing or panicking
/// callback is logged and does not prevent the others from running.
/// Dispatch works on a snapshot of the registry, so callbacks may subscribe
/// or unsubscribe (themselves included) while a frame is being delivered.
pub struct Dispatcher {
    subscriptions: RwLock<Vec<Subscription>>,
    next_id: AtomicU64,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("subscription_count", &self.len())
            .finish()
    }
}

impl Dispatcher {
    /// Create an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register `callback` for frames of `frame_type`.
    pub fn subscribe<F>(&self, frame_type: impl Into<String>, callback: F) -> SubscriptionId
    where
        F: Fn(&Frame) -> SubscriberResult + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let frame_type = frame_type.into();
        debug!(frame_type = %frame_type, subscription = id.0, "Subscriber registered");

        self.subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscription {
                id,
                frame_type,
                callback: Arc::new(callback),
            });
        id
    }

    /// Remove a subscription.
    ///
    /// Returns `true` if it was registered. Unknown or already removed ids
    /// are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self
            .subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subs.len();
        subs.retain(|sub| sub.id != id);
        let removed = subs.len() != before;

        if removed {
            debug!(subscription = id.0, "Subscriber unregistered");
        }
        removed
    }

    /// Deliver `frame` to every subscriber of its type.
    pub fn dispatch(&self, frame: &Frame) -> DispatchOutcome {
        let targets: Vec<(SubscriptionId, Callback)> = self
            .subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|sub| sub.frame_type == frame.frame_type)
            .map(|sub| (sub.id, Arc::clone(&sub.callback)))
            .collect();

        let mut outcome = DispatchOutcome::default();
        if targets.is_empty() {
            debug!(frame_type = %frame.frame_type, "No subscribers for frame");
            return outcome;
        }

        for (id, callback) in targets {
            trace!(frame_type = %frame.frame_type, subscription = id.0, "Delivering frame");

            match catch_unwind(AssertUnwindSafe(|| callback(frame))) {
                Ok(Ok(())) => outcome.delivered = outcome.delivered.saturating_add(1),
                Ok(Err(err)) => {
                    warn!(
                        frame_type = %frame.frame_type,
                        subscription = id.0,
                        error = %err,
                        "Subscriber failed"
                    );
                    outcome.failed = outcome.failed.saturating_add(1);
                },
                Err(panic) => {
                    warn!(
                        frame_type = %frame.frame_type,
                        subscription = id.0,
                        error = ?panic,
                        "Subscriber panicked"
                    );
                    outcome.failed = outcome.failed.saturating_add(1);
                },
            }
        }
        outcome
    }

    /// Number of subscribers for `frame_type`.
    #[must_use]
    pub fn subscriber_count(&self, frame_type: &str) -> usize {
        self.subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|sub| sub.frame_type == frame_type)
            .count()
    }

    /// Total number of subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether there are no subscriptions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every subscription.
    pub fn clear(&self) {
        self.subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    fn log() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[test]
    fn dispatch_runs_in_registration_order_despite_failures() {
        let dispatcher = Dispatcher::new();
        let log = log();

        let a = Arc::clone(&log);
        dispatcher.subscribe("new_comment", move |_| {
            a.lock().unwrap().push("A".into());
            Ok(())
        });
        let b = Arc::clone(&log);
        dispatcher.subscribe("new_comment", move |_| {
            b.lock().unwrap().push("B".into());
            Err("boom".into())
        });
        let c = Arc::clone(&log);
        dispatcher.subscribe("new_comment", move |_| {
            c.lock().unwrap().push("C".into());
            Ok(())
        });

        let outcome = dispatcher.dispatch(&Frame::empty("new_comment"));
        assert_eq!(*log.lock().unwrap(), ["A", "B", "C"]);
        assert_eq!(
            outcome,
            DispatchOutcome {
                delivered: 2,
                failed: 1
            }
        );
    }

    #[test]
    fn panicking_subscriber_is_isolated() {
        let dispatcher = Dispatcher::new();
        let log = log();

        dispatcher.subscribe("user_joined", |_| panic!("subscriber bug"));
        let after = Arc::clone(&log);
        dispatcher.subscribe("user_joined", move |_| {
            after.lock().unwrap().push("after".into());
            Ok(())
        });

        let outcome = dispatcher.dispatch(&Frame::empty("user_joined"));
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.delivered, 1);
        assert_eq!(*log.lock().unwrap(), ["after"]);
    }

    #[test]
    fn only_matching_type_is_invoked() {
        let dispatcher = Dispatcher::new();
        let log = log();
        let seen = Arc::clone(&log);
        dispatcher.subscribe("session_started", move |frame| {
            seen.lock()
                .unwrap()
                .push(frame.payload["session"]["id"].as_str().unwrap_or("").into());
            Ok(())
        });

        let unmatched = dispatcher.dispatch(&Frame::empty("progress_update"));
        assert!(unmatched.unmatched());

        dispatcher.dispatch(&Frame::new(
            "session_started",
            json!({"session": {"id": "s1"}}),
        ));
        assert_eq!(*log.lock().unwrap(), ["s1"]);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let dispatcher = Dispatcher::new();
        let id = dispatcher.subscribe("pong", |_| Ok(()));
        assert_eq!(dispatcher.subscriber_count("pong"), 1);

        assert!(dispatcher.unsubscribe(id));
        assert!(!dispatcher.unsubscribe(id));
        assert!(dispatcher.is_empty());
    }

    #[test]
    fn callback_can_unsubscribe_itself_during_dispatch() {
        let dispatcher = Arc::new(Dispatcher::new());
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));
        let calls = Arc::new(AtomicU64::new(0));

        let d = Arc::clone(&dispatcher);
        let s = Arc::clone(&slot);
        let n = Arc::clone(&calls);
        let id = dispatcher.subscribe("typing_indicator", move |_| {
            n.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = s.lock().unwrap().take() {
                d.unsubscribe(id);
            }
            Ok(())
        });
        *slot.lock().unwrap() = Some(id);

        dispatcher.dispatch(&Frame::empty("typing_indicator"));
        dispatcher.dispatch(&Frame::empty("typing_indicator"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.subscriber_count("typing_indicator"), 0);
    }

    #[test]
    fn clear_removes_everything() {
        let dispatcher = Dispatcher::new();
        dispatcher.subscribe("a", |_| Ok(()));
        dispatcher.subscribe("b", |_| Ok(()));
        assert_eq!(dispatcher.len(), 2);
        dispatcher.clear();
        assert!(dispatcher.is_empty());
    }
}
