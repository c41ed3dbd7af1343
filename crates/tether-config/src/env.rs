//! `TETHER_*` environment overrides.
//!
//! Environment variables are the last layer: they replace whatever the
//! embedded defaults and config files set.

use std::collections::HashMap;
use std::hash::BuildHasher;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::merge::set_path;

/// Variable naming a directory that replaces `~/.tether`.
pub const HOME_VAR: &str = "TETHER_HOME";

#[derive(Clone, Copy)]
enum Kind {
    Text,
    Integer,
}

struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
    kind: Kind,
}

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "TETHER_SERVER_URL",
        field_path: "server.base_url",
        kind: Kind::Text,
    },
    EnvMapping {
        var_name: "TETHER_TOKEN",
        field_path: "server.token",
        kind: Kind::Text,
    },
    EnvMapping {
        var_name: "TETHER_LOG_LEVEL",
        field_path: "logging.level",
        kind: Kind::Text,
    },
    EnvMapping {
        var_name: "TETHER_LOG_FORMAT",
        field_path: "logging.format",
        kind: Kind::Text,
    },
    EnvMapping {
        var_name: "TETHER_RATE_LIMIT_MS",
        field_path: "request.rate_limit_interval_ms",
        kind: Kind::Integer,
    },
    EnvMapping {
        var_name: "TETHER_MAX_RETRIES",
        field_path: "request.max_retries",
        kind: Kind::Integer,
    },
    EnvMapping {
        var_name: "TETHER_MAX_RECONNECT_ATTEMPTS",
        field_path: "channel.max_reconnect_attempts",
        kind: Kind::Integer,
    },
];

/// Apply every mapped variable present in `env_vars` to `merged`.
///
/// Empty values are ignored. Returns the number of overrides applied.
///
/// # Errors
///
/// Returns [`ConfigError::EnvError`] if a numeric variable does not parse.
pub fn apply_env_overrides<S: BuildHasher>(
    merged: &mut toml::Table,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<usize> {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        let Some(raw) = env_vars.get(mapping.var_name) else {
            continue;
        };
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let value = match mapping.kind {
            Kind::Text => toml::Value::String(raw.to_owned()),
            Kind::Integer => {
                let parsed: i64 = raw.parse().map_err(|_| ConfigError::EnvError {
                    var_name: mapping.var_name.to_owned(),
                    message: format!("expected a non-negative integer, got '{raw}'"),
                })?;
                if parsed < 0 {
                    return Err(ConfigError::EnvError {
                        var_name: mapping.var_name.to_owned(),
                        message: format!("expected a non-negative integer, got '{raw}'"),
                    });
                }
                toml::Value::Integer(parsed)
            },
        };

        debug!(var = mapping.var_name, field = mapping.field_path, "applied env override");
        set_path(merged, mapping.field_path, value);
        count = count.saturating_add(1);
    }

    Ok(count)
}
