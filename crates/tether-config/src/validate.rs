//! Post-merge configuration validation.

use url::Url;

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Log levels accepted by `logging.level`.
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Formats accepted by `logging.format`.
pub const LOG_FORMATS: &[&str] = &["pretty", "compact", "json"];

/// Validate a fully merged configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_server(config)?;
    validate_channel(config)?;
    validate_request(config)?;
    validate_typing(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn require_non_zero(field: &str, value: u64) -> ConfigResult<()> {
    if value == 0 {
        return Err(invalid(field, "must be greater than zero"));
    }
    Ok(())
}

fn validate_server(config: &Config) -> ConfigResult<()> {
    let url = Url::parse(&config.server.base_url).map_err(|e| {
        invalid(
            "server.base_url",
            format!("'{}' is not a valid URL: {e}", config.server.base_url),
        )
    })?;

    if !matches!(url.scheme(), "http" | "https" | "ws" | "wss") {
        return Err(invalid(
            "server.base_url",
            format!(
                "unsupported scheme '{}'; expected one of: http, https, ws, wss",
                url.scheme()
            ),
        ));
    }

    if config.server.token.as_deref().is_some_and(str::is_empty) {
        return Err(invalid("server.token", "must not be empty when set"));
    }
    Ok(())
}

fn validate_channel(config: &Config) -> ConfigResult<()> {
    let c = &config.channel;
    require_non_zero(
        "channel.max_reconnect_attempts",
        u64::from(c.max_reconnect_attempts),
    )?;
    require_non_zero("channel.reconnect_base_ms", c.reconnect_base_ms)?;
    require_non_zero("channel.handshake_timeout_secs", c.handshake_timeout_secs)?;
    require_non_zero("channel.close_timeout_secs", c.close_timeout_secs)?;

    if c.reconnect_max_delay().as_millis() < u128::from(c.reconnect_base_ms) {
        return Err(invalid(
            "channel.reconnect_max_delay_secs",
            "must not be shorter than channel.reconnect_base_ms",
        ));
    }
    Ok(())
}

fn validate_request(config: &Config) -> ConfigResult<()> {
    let r = &config.request;
    require_non_zero("request.max_retries", u64::from(r.max_retries))?;
    require_non_zero("request.retry_base_ms", r.retry_base_ms)?;
    require_non_zero("request.rate_limit_interval_ms", r.rate_limit_interval_ms)?;
    require_non_zero("request.timeout_secs", r.timeout_secs)?;
    if r.cache_capacity == 0 {
        return Err(invalid("request.cache_capacity", "must be greater than zero"));
    }
    Ok(())
}

fn validate_typing(config: &Config) -> ConfigResult<()> {
    require_non_zero("typing.debounce_ms", config.typing.debounce_ms)
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
        return Err(invalid(
            "logging.level",
            format!(
                "unsupported log level '{}'; expected one of: {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            ),
        ));
    }

    if !LOG_FORMATS.contains(&config.logging.format.as_str()) {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported log format '{}'; expected one of: {}",
                config.logging.format,
                LOG_FORMATS.join(", ")
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(result: ConfigResult<()>) -> String {
        match result {
            Err(ConfigError::ValidationError { field, .. }) => field,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn zero_reconnect_attempts_rejected() {
        let mut config = Config::default();
        config.channel.max_reconnect_attempts = 0;
        assert_eq!(field_of(validate(&config)), "channel.max_reconnect_attempts");
    }

    #[test]
    fn zero_heartbeat_is_allowed() {
        let mut config = Config::default();
        config.channel.heartbeat_interval_secs = 0;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn zero_rate_limit_rejected() {
        let mut config = Config::default();
        config.request.rate_limit_interval_ms = 0;
        assert_eq!(field_of(validate(&config)), "request.rate_limit_interval_ms");
    }

    #[test]
    fn zero_cache_capacity_rejected() {
        let mut config = Config::default();
        config.request.cache_capacity = 0;
        assert_eq!(field_of(validate(&config)), "request.cache_capacity");
    }

    #[test]
    fn base_url_scheme_checked() {
        let mut config = Config::default();
        config.server.base_url = "ftp://files.example.com".to_owned();
        assert_eq!(field_of(validate(&config)), "server.base_url");

        config.server.base_url = "not a url".to_owned();
        assert_eq!(field_of(validate(&config)), "server.base_url");

        config.server.base_url = "wss://rt.example.com".to_owned();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn empty_token_rejected() {
        let mut config = Config::default();
        config.server.token = Some(String::new());
        assert_eq!(field_of(validate(&config)), "server.token");
    }

    #[test]
    fn unknown_log_level_rejected() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_owned();
        assert_eq!(field_of(validate(&config)), "logging.level");
    }

    #[test]
    fn unknown_log_format_rejected() {
        let mut config = Config::default();
        config.logging.format = "full".to_owned();
        assert_eq!(field_of(validate(&config)), "logging.format");
    }

    #[test]
    fn max_delay_below_base_rejected() {
        let mut config = Config::default();
        config.channel.reconnect_base_ms = 5_000;
        config.channel.reconnect_max_delay_secs = 1;
        assert_eq!(
            field_of(validate(&config)),
            "channel.reconnect_max_delay_secs"
        );
    }
}
