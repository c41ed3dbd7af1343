//! Config file discovery and layered loading.
//!
//! 1. Parse `defaults.toml` into the base table
//! 2. Merge the user file (`~/.tether/config.toml` or `$TETHER_HOME/config.toml`)
//! 3. Merge the explicit `--config` file, which must exist
//! 4. Apply `TETHER_*` environment overrides
//! 5. Deserialize into [`Config`] and validate

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::env::{HOME_VAR, apply_env_overrides};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::deep_merge;
use crate::show::ResolvedConfig;
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum accepted config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: usize = 1_048_576;

/// Where to look for configuration.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// File given on the command line. Missing is an error.
    pub explicit_file: Option<PathBuf>,
    /// Directory used in place of `~/.tether` and `TETHER_HOME`.
    pub home_override: Option<PathBuf>,
}

/// Load configuration from the real environment.
///
/// # Errors
///
/// Returns a [`ConfigError`] if a file is malformed, an override is
/// invalid, or the merged configuration fails validation.
pub fn load(options: &LoadOptions) -> ConfigResult<ResolvedConfig> {
    let env_vars: HashMap<String, String> = std::env::vars().collect();
    let tether_dir = match &options.home_override {
        Some(dir) => dir.clone(),
        None => tether_dir(&env_vars)?,
    };
    load_from(options.explicit_file.as_deref(), &tether_dir, &env_vars)
}

/// Load configuration with an explicit `.tether` directory and environment.
///
/// # Errors
///
/// See [`load`].
pub fn load_from<S: std::hash::BuildHasher>(
    explicit_file: Option<&Path>,
    tether_dir: &Path,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<ResolvedConfig> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;
    let mut loaded_files = Vec::new();

    let user_path = tether_dir.join("config.toml");
    if let Some(overlay) = try_load_file(&user_path)? {
        deep_merge(&mut merged, &overlay);
        loaded_files.push(user_path.display().to_string());
        info!(path = %user_path.display(), "loaded user config");
    }

    if let Some(path) = explicit_file {
        let overlay = try_load_file(path)?.ok_or_else(|| ConfigError::ReadError {
            path: path.display().to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })?;
        deep_merge(&mut merged, &overlay);
        loaded_files.push(path.display().to_string());
        info!(path = %path.display(), "loaded config file");
    }

    let env_overrides = match merged.as_table_mut() {
        Some(table) => apply_env_overrides(table, env_vars)?,
        None => 0,
    };
    if env_overrides > 0 {
        debug!(count = env_overrides, "applied environment overrides");
    }

    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        loaded_files,
        env_overrides,
    })
}

/// Load a single file with no layering.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed or
/// validated.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let value = try_load_file(path)?.ok_or_else(|| ConfigError::ReadError {
        path: path.display().to_string(),
        source: std::io::Error::from(std::io::ErrorKind::NotFound),
    })?;
    let config: Config = value
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::ParseError {
            path: path.display().to_string(),
            source: e,
        })?;
    validate::validate(&config)?;
    Ok(config)
}

/// Read and parse a file, returning `None` if it does not exist.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    if content.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit",
                content.len()
            ),
        });
    }

    let value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(Some(value))
}

/// `$TETHER_HOME` if it names a directory, else `~/.tether`.
fn tether_dir<S: std::hash::BuildHasher>(
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<PathBuf> {
    if let Some(raw) = env_vars.get(HOME_VAR).filter(|raw| !raw.is_empty()) {
        let candidate = PathBuf::from(raw);
        if candidate.is_dir() {
            return Ok(candidate);
        }
        warn!(path = %raw, "TETHER_HOME is not a directory; ignoring");
    }

    directories::BaseDirs::new()
        .map(|d| d.home_dir().join(".tether"))
        .ok_or(ConfigError::NoHomeDir)
}
