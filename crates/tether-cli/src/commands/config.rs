//! Config command - print the resolved configuration.

use anyhow::anyhow;
use tether_config::ResolvedConfig;

/// Print the resolved configuration, or one section of it, as TOML.
pub(crate) fn show_config(resolved: &ResolvedConfig, section: Option<&str>) -> anyhow::Result<()> {
    let output = resolved.show_toml(section).map_err(|_| match section {
        Some(name) => anyhow!("unknown config section '{name}'"),
        None => anyhow!("failed to render configuration"),
    })?;
    print!("{output}");
    Ok(())
}
