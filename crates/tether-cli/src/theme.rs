//! CLI styling. Everything here goes to stderr so stdout stays pipeable.

use colored::Colorize;
use tether_core::{ConnectionState, StateChange};

pub(crate) struct Theme;

impl Theme {
    pub(crate) fn success(text: &str) -> String {
        format!("{} {}", "✓".green(), text)
    }

    pub(crate) fn error(text: &str) -> String {
        format!("{} {}", "✗".red(), text.red())
    }

    pub(crate) fn warning(text: &str) -> String {
        format!("{} {}", "!".yellow(), text.yellow())
    }

    pub(crate) fn info(text: &str) -> String {
        format!("{} {}", "i".blue(), text)
    }

    /// One line per channel state change.
    pub(crate) fn state_change(change: StateChange) -> String {
        let to = change.to.to_string();
        let styled = match change.to {
            ConnectionState::Open => to.green().bold(),
            ConnectionState::Reconnecting | ConnectionState::Connecting => to.yellow(),
            ConnectionState::Failed => to.red().bold(),
            ConnectionState::Idle | ConnectionState::Closed => to.dimmed(),
        };
        format!("{} {} → {}", "~".blue(), change.from.to_string().dimmed(), styled)
    }
}
