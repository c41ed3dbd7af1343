#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Layered configuration for the Tether client.
//!
//! # Usage
//!
//! ```rust,no_run
//! use tether_config::Config;
//!
//! let resolved = Config::load(None).unwrap();
//! println!("Connecting to {}", resolved.config.server.base_url);
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Environment variables** (`TETHER_SERVER_URL`, `TETHER_LOG_LEVEL`, ...)
//! 2. **Explicit file** (`tether --config <file>`)
//! 3. **User** (`~/.tether/config.toml`, or `$TETHER_HOME/config.toml`)
//! 4. **Embedded defaults** (`defaults.toml` compiled into the binary)
//!
//! This crate has no dependencies on other tether crates. Conversion into
//! channel and request settings happens in the CLI.

/// `TETHER_*` environment overrides.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Merging of TOML layers.
pub mod merge;
/// Resolved configuration display.
pub mod show;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::LoadOptions;
pub use show::ResolvedConfig;
pub use types::*;

impl Config {
    /// Load configuration with the full precedence chain.
    ///
    /// `explicit_file` is layered on top of the user file and must exist.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the final
    /// configuration fails validation.
    pub fn load(explicit_file: Option<&std::path::Path>) -> ConfigResult<ResolvedConfig> {
        loader::load(&LoadOptions {
            explicit_file: explicit_file.map(std::path::Path::to_path_buf),
            home_override: None,
        })
    }

    /// Load configuration with an explicit `.tether` directory.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the final
    /// configuration fails validation.
    pub fn load_with_home(
        explicit_file: Option<&std::path::Path>,
        tether_dir: &std::path::Path,
    ) -> ConfigResult<ResolvedConfig> {
        loader::load(&LoadOptions {
            explicit_file: explicit_file.map(std::path::Path::to_path_buf),
            home_override: Some(tether_dir.to_path_buf()),
        })
    }
}
