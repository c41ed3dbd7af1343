//! Channel connection states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Constructed, never opened.
    Idle,
    /// A handshake is in progress.
    Connecting,
    /// Connected; frames flow both ways.
    Open,
    /// Waiting out a backoff delay before the next handshake.
    Reconnecting,
    /// Closed by the caller or by a normal server close. Terminal.
    Closed,
    /// The reconnect budget was exhausted. `open()` may be called again.
    Failed,
}

impl ConnectionState {
    /// Whether the channel is working towards (or holding) a connection.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Open | Self::Reconnecting)
    }

    /// Lowercase name used in logs and status output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Reconnecting => "reconnecting",
            Self::Closed => "closed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single applied transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    /// State before the transition.
    pub from: ConnectionState,
    /// State after the transition.
    pub to: ConnectionState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_states() {
        assert!(ConnectionState::Connecting.is_active());
        assert!(ConnectionState::Open.is_active());
        assert!(ConnectionState::Reconnecting.is_active());
        assert!(!ConnectionState::Idle.is_active());
        assert!(!ConnectionState::Closed.is_active());
        assert!(!ConnectionState::Failed.is_active());
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&ConnectionState::Reconnecting).unwrap();
        assert_eq!(json, "\"reconnecting\"");
    }
}
