//! Lifecycle listeners.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tether_core::StateChange;
use tracing::warn;

type Listener = Arc<dyn Fn(StateChange) + Send + Sync>;

/// Handle for removing a state listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Callbacks notified of every channel state transition.
///
/// Same isolation rules as the frame dispatcher: listeners run in
/// registration order on a snapshot and a panicking listener is logged.
#[derive(Default)]
pub struct StateListeners {
    listeners: RwLock<Vec<(ListenerId, Listener)>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for StateListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateListeners")
            .field("listener_count", &self.len())
            .finish()
    }
}

impl StateListeners {
    /// Register a listener.
    pub fn add<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(StateChange) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns `true` if it was registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// Notify every listener of `change`.
    pub fn notify(&self, change: StateChange) {
        let snapshot: Vec<(ListenerId, Listener)> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, listener)| (*id, Arc::clone(listener)))
            .collect();

        for (id, listener) in snapshot {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| listener(change))) {
                warn!(
                    listener = id.0,
                    from = %change.from,
                    to = %change.to,
                    error = ?panic,
                    "State listener panicked"
                );
            }
        }
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tether_core::ConnectionState;

    fn change(from: ConnectionState, to: ConnectionState) -> StateChange {
        StateChange { from, to }
    }

    #[test]
    fn listeners_receive_changes_in_order() {
        let listeners = StateListeners::default();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s = Arc::clone(&seen);
        listeners.add(move |c| s.lock().unwrap().push(c.to));
        listeners.notify(change(ConnectionState::Idle, ConnectionState::Connecting));
        listeners.notify(change(ConnectionState::Connecting, ConnectionState::Open));

        assert_eq!(
            *seen.lock().unwrap(),
            [ConnectionState::Connecting, ConnectionState::Open]
        );
    }

    #[test]
    fn removed_listener_is_not_called() {
        let listeners = StateListeners::default();
        let seen = Arc::new(Mutex::new(0usize));
        let s = Arc::clone(&seen);
        let id = listeners.add(move |_| {
            let mut n = s.lock().unwrap();
            *n = n.saturating_add(1);
        });

        assert!(listeners.remove(id));
        assert!(!listeners.remove(id));
        listeners.notify(change(ConnectionState::Open, ConnectionState::Closed));
        assert_eq!(*seen.lock().unwrap(), 0);
        assert!(listeners.is_empty());
    }

    #[test]
    fn panicking_listener_does_not_block_others() {
        let listeners = StateListeners::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        listeners.add(|_| panic!("listener bug"));
        let s = Arc::clone(&seen);
        listeners.add(move |c| s.lock().unwrap().push(c.to));

        listeners.notify(change(ConnectionState::Open, ConnectionState::Reconnecting));
        assert_eq!(*seen.lock().unwrap(), [ConnectionState::Reconnecting]);
    }
}
