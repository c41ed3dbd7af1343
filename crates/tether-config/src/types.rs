//! Configuration types.
//!
//! Every section is `#[serde(default)]`, so a file only needs the keys it
//! changes. Durations are stored as integer seconds or milliseconds and
//! exposed as [`Duration`] through accessors.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server location and credentials.
    pub server: ServerSection,
    /// Channel heartbeat, handshake and reconnect tuning.
    pub channel: ChannelSection,
    /// Retry, rate limit and cache settings for HTTP requests.
    pub request: RequestSection,
    /// Typing indicator debounce.
    pub typing: TypingSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// ServerSection
// ---------------------------------------------------------------------------

/// Where the server lives.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Origin for both HTTP requests and channels. `http`/`https` origins
    /// are mapped to `ws`/`wss` for channels.
    pub base_url: String,
    /// Bearer token for requests and the channel `token` query parameter.
    #[serde(skip_serializing)]
    pub token: Option<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_owned(),
            token: None,
        }
    }
}

impl std::fmt::Debug for ServerSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerSection")
            .field("base_url", &self.base_url)
            .field("has_token", &self.token.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ChannelSection
// ---------------------------------------------------------------------------

/// Channel tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelSection {
    /// Seconds between heartbeat pings. `0` disables the heartbeat.
    pub heartbeat_interval_secs: u64,
    /// Seconds allowed for one handshake.
    pub handshake_timeout_secs: u64,
    /// Seconds allowed for the close frame on shutdown.
    pub close_timeout_secs: u64,
    /// Base reconnect delay; attempt `n` waits `base * 2^(n-1)`.
    pub reconnect_base_ms: u64,
    /// Upper bound on a single reconnect delay.
    pub reconnect_max_delay_secs: u64,
    /// Consecutive failed reconnects before the channel gives up.
    pub max_reconnect_attempts: u32,
}

impl Default for ChannelSection {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: 30,
            handshake_timeout_secs: 10,
            close_timeout_secs: 2,
            reconnect_base_ms: 1000,
            reconnect_max_delay_secs: 60,
            max_reconnect_attempts: 5,
        }
    }
}

impl ChannelSection {
    /// Heartbeat period.
    #[must_use]
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    /// Handshake limit.
    #[must_use]
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    /// Close frame limit.
    #[must_use]
    pub fn close_timeout(&self) -> Duration {
        Duration::from_secs(self.close_timeout_secs)
    }

    /// Base reconnect delay.
    #[must_use]
    pub fn reconnect_base(&self) -> Duration {
        Duration::from_millis(self.reconnect_base_ms)
    }

    /// Reconnect delay cap.
    #[must_use]
    pub fn reconnect_max_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_max_delay_secs)
    }
}

// ---------------------------------------------------------------------------
// RequestSection
// ---------------------------------------------------------------------------

/// HTTP request policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestSection {
    /// Total attempts per request, including the first.
    pub max_retries: u32,
    /// Base retry delay; attempt `n` waits `base * n`.
    pub retry_base_ms: u64,
    /// Minimum spacing between transmissions.
    pub rate_limit_interval_ms: u64,
    /// Maximum number of cached responses.
    pub cache_capacity: usize,
    /// Per-request timeout of the HTTP client.
    pub timeout_secs: u64,
}

impl Default for RequestSection {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_base_ms: 1000,
            rate_limit_interval_ms: 2000,
            cache_capacity: 100,
            timeout_secs: 30,
        }
    }
}

impl RequestSection {
    /// Base retry delay.
    #[must_use]
    pub fn retry_base(&self) -> Duration {
        Duration::from_millis(self.retry_base_ms)
    }

    /// Minimum spacing between transmissions.
    #[must_use]
    pub fn rate_limit_interval(&self) -> Duration {
        Duration::from_millis(self.rate_limit_interval_ms)
    }

    /// HTTP client timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// TypingSection
// ---------------------------------------------------------------------------

/// Typing indicator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypingSection {
    /// Quiet period before `typing_stop` is sent.
    pub debounce_ms: u64,
}

impl Default for TypingSection {
    fn default() -> Self {
        Self { debounce_ms: 3000 }
    }
}

impl TypingSection {
    /// Quiet period as a [`Duration`].
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"` or `"json"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["tether_channel=debug"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config: Config = toml::from_str("[channel]\nmax_reconnect_attempts = 9\n").unwrap();
        assert_eq!(config.channel.max_reconnect_attempts, 9);
        assert_eq!(config.channel.heartbeat_interval(), Duration::from_secs(30));
        assert_eq!(config.request, RequestSection::default());
    }

    #[test]
    fn debug_hides_token() {
        let server = ServerSection {
            token: Some("secret-token".to_owned()),
            ..ServerSection::default()
        };
        let debug = format!("{server:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("has_token: true"));
    }

    #[test]
    fn serialize_omits_token() {
        let mut config = Config::default();
        config.server.token = Some("secret-token".to_owned());
        let text = toml::to_string(&config).unwrap();
        assert!(!text.contains("secret-token"));
        assert!(!text.contains("token"));
    }

    #[test]
    fn accessors_convert_units() {
        let config = Config::default();
        assert_eq!(config.request.rate_limit_interval(), Duration::from_secs(2));
        assert_eq!(config.request.retry_base(), Duration::from_secs(1));
        assert_eq!(config.typing.debounce(), Duration::from_secs(3));
        assert_eq!(config.channel.reconnect_base(), Duration::from_secs(1));
    }
}
