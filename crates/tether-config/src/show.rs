//! Display of the resolved configuration for `tether config`.

use std::fmt::{self, Write as _};

use crate::types::Config;

/// A resolved configuration and where it came from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The final merged configuration.
    pub config: Config,
    /// Config files that were loaded, in precedence order.
    pub loaded_files: Vec<String>,
    /// Number of `TETHER_*` environment overrides applied.
    pub env_overrides: usize,
}

impl ResolvedConfig {
    /// Render the configuration as TOML, optionally a single section.
    ///
    /// The server token is never included.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or `section` does not exist.
    pub fn show_toml(&self, section: Option<&str>) -> Result<String, fmt::Error> {
        let body = if let Some(section_name) = section {
            let val = toml::Value::try_from(&self.config).map_err(|_| fmt::Error)?;
            let table = val.as_table().ok_or(fmt::Error)?;
            let section_val = table.get(section_name).ok_or(fmt::Error)?;
            let mut wrapped = toml::Table::new();
            wrapped.insert(section_name.to_owned(), section_val.clone());
            toml::to_string_pretty(&wrapped).map_err(|_| fmt::Error)?
        } else {
            toml::to_string_pretty(&self.config).map_err(|_| fmt::Error)?
        };

        let mut output = String::from("# Resolved Tether configuration\n");
        if self.loaded_files.is_empty() {
            output.push_str("# No config files loaded; using built-in defaults\n");
        } else {
            output.push_str("#\n# Loaded files (in precedence order):\n");
            for (i, path) in self.loaded_files.iter().enumerate() {
                writeln!(output, "#   {}. {path}", i.saturating_add(1))?;
            }
        }
        if self.env_overrides > 0 {
            writeln!(output, "# Environment overrides: {}", self.env_overrides)?;
        }
        output.push('\n');
        output.push_str(&body);
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved() -> ResolvedConfig {
        ResolvedConfig {
            config: Config::default(),
            loaded_files: vec!["/home/u/.tether/config.toml".to_owned()],
            env_overrides: 2,
        }
    }

    #[test]
    fn full_output_lists_files_and_sections() {
        let out = resolved().show_toml(None).unwrap();
        assert!(out.contains("1. /home/u/.tether/config.toml"));
        assert!(out.contains("Environment overrides: 2"));
        assert!(out.contains("[channel]"));
        assert!(out.contains("[request]"));
    }

    #[test]
    fn single_section_output() {
        let out = resolved().show_toml(Some("typing")).unwrap();
        assert!(out.contains("[typing]"));
        assert!(out.contains("debounce_ms = 3000"));
        assert!(!out.contains("[channel]"));
    }

    #[test]
    fn unknown_section_is_an_error() {
        assert!(resolved().show_toml(Some("nope")).is_err());
    }

    #[test]
    fn token_never_shown() {
        let mut r = resolved();
        r.config.server.token = Some("hunter2".to_owned());
        assert!(!r.show_toml(None).unwrap().contains("hunter2"));
    }
}
