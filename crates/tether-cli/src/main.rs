//! Tether CLI - watch real-time channels and issue resilient requests.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tether_config::Config;
use tether_core::Method;

mod commands;
mod config_bridge;
mod theme;

use commands::request::RequestArgs;
use commands::watch::WatchArgs;
use theme::Theme;

/// Tether - resilient real-time client
#[derive(Parser)]
#[command(name = "tether")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file layered over ~/.tether/config.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Bearer token; also sent as the channel `token` query parameter
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a channel and print inbound frames as JSON lines
    Watch {
        /// Endpoint path, e.g. /api/v1/ws/threads/{id}
        path: String,

        /// Value substituted for `{id}` in the path
        #[arg(short, long)]
        param: Option<String>,

        /// Frame types to print (repeatable); defaults to every known type
        #[arg(short = 't', long = "type")]
        types: Vec<String>,
    },

    /// Send one request with retry, rate limiting and caching
    Request {
        /// HTTP method
        method: Method,

        /// Path resolved against the server base URL
        path: String,

        /// JSON request body
        #[arg(short, long)]
        body: Option<String>,

        /// Allow answering from the response cache
        #[arg(long)]
        cache: bool,
    },

    /// Print the resolved configuration as TOML
    Config {
        /// Only this section (server, channel, request, typing, logging)
        section: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut resolved = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(token) = cli.token {
        resolved.config.server.token = Some(token);
    }

    let mut log_config = config_bridge::to_log_config(&resolved.config);
    if cli.verbose {
        "debug".clone_into(&mut log_config.level);
    }
    if let Err(e) = tether_telemetry::setup_logging(&log_config) {
        eprintln!("{}", Theme::error(&format!("Failed to initialize logging: {e}")));
    }

    match cli.command {
        Commands::Watch { path, param, types } => {
            commands::watch::run_watch(&resolved.config, WatchArgs { path, param, types }).await?;
        },
        Commands::Request {
            method,
            path,
            body,
            cache,
        } => {
            commands::request::run_request(
                &resolved.config,
                RequestArgs {
                    method,
                    path,
                    body,
                    cache,
                },
            )
            .await?;
        },
        Commands::Config { section } => {
            commands::config::show_config(&resolved, section.as_deref())?;
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn watch_accepts_repeated_types() {
        let cli = Cli::try_parse_from([
            "tether", "watch", "/ws/threads/{id}", "-p", "t1", "-t", "new_comment", "-t",
            "user_joined",
        ])
        .unwrap();
        let Commands::Watch { param, types, .. } = cli.command else {
            panic!("expected watch");
        };
        assert_eq!(param.as_deref(), Some("t1"));
        assert_eq!(types, ["new_comment", "user_joined"]);
    }

    #[test]
    fn request_parses_method() {
        let cli = Cli::try_parse_from(["tether", "--token", "abc", "request", "post", "/x"]).unwrap();
        assert_eq!(cli.token.as_deref(), Some("abc"));
        let Commands::Request { method, .. } = cli.command else {
            panic!("expected request");
        };
        assert_eq!(method, Method::Post);
    }

    #[test]
    fn unknown_method_is_rejected() {
        assert!(Cli::try_parse_from(["tether", "request", "brew", "/x"]).is_err());
    }
}
