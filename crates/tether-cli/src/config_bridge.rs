//! Bridge from `tether_config::Config` to channel, request and logging
//! settings.

use std::sync::Arc;

use tether_channel::ChannelConfig;
use tether_config::Config;
use tether_core::{
    CredentialProvider, NoCredentials, ReconnectBackoff, RetryBackoff, StaticCredentials,
};
use tether_request::RequestConfig;
use tether_telemetry::{LogConfig, LogFormat};

/// Channel tuning from the `[channel]` section.
pub(crate) fn channel_config(config: &Config) -> ChannelConfig {
    let c = &config.channel;
    ChannelConfig {
        reconnect: ReconnectBackoff::new(c.reconnect_base(), c.max_reconnect_attempts)
            .with_max_delay(c.reconnect_max_delay()),
        heartbeat_interval: c.heartbeat_interval(),
        handshake_timeout: c.handshake_timeout(),
        close_timeout: c.close_timeout(),
    }
}

/// Request policy from the `[request]` section.
pub(crate) fn request_config(config: &Config) -> RequestConfig {
    let r = &config.request;
    RequestConfig {
        retry: RetryBackoff::new(r.retry_base(), r.max_retries),
        rate_limit_interval: r.rate_limit_interval(),
        cache_capacity: r.cache_capacity,
    }
}

/// Logging setup from the `[logging]` section.
///
/// Falls back to compact `info` output if the section does not convert.
pub(crate) fn to_log_config(config: &Config) -> LogConfig {
    LogConfig::try_from(&config.logging)
        .unwrap_or_else(|_| LogConfig::new("info").with_format(LogFormat::Compact))
}

/// Bearer credentials when a token is configured.
pub(crate) fn credentials(config: &Config) -> Arc<dyn CredentialProvider> {
    match &config.server.token {
        Some(token) => Arc::new(StaticCredentials::bearer(token.clone())),
        None => Arc::new(NoCredentials),
    }
}
