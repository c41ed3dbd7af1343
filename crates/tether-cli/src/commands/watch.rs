//! Watch command - stream frames from a channel.
//!
//! Inbound frames are printed to stdout as JSON lines. Lines read from stdin
//! drive the channel: `/typing` and `/stop` feed the typing coordinator,
//! `/participants` asks for the participant list, and any other line is
//! parsed as a JSON frame and sent as-is.

use std::sync::Arc;

use serde_json::{Value, json};
use tether_channel::{Channel, TypingCoordinator};
use tether_config::Config;
use tether_core::{ConnectionState, Endpoint, Frame, FrameSink, frame_type};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::config_bridge;
use crate::theme::Theme;

/// Inbound types printed when no `--type` is given.
const INBOUND_TYPES: &[&str] = &[
    frame_type::SESSION_STARTED,
    frame_type::PATCH_SCANNED,
    frame_type::PROGRESS_UPDATE,
    frame_type::SESSION_COMPLETED,
    frame_type::KERNEL_READY,
    frame_type::ERROR,
    frame_type::NEW_COMMENT,
    frame_type::COMMENT_UPDATED,
    frame_type::THREAD_UPDATED,
    frame_type::USER_JOINED,
    frame_type::USER_LEFT,
    frame_type::TYPING_INDICATOR,
    frame_type::PARTICIPANTS,
    frame_type::HEARTBEAT,
    frame_type::PING,
    frame_type::PONG,
];

/// What to watch.
pub(crate) struct WatchArgs {
    pub(crate) path: String,
    pub(crate) param: Option<String>,
    pub(crate) types: Vec<String>,
}

/// One line of user input.
#[derive(Debug, PartialEq)]
enum Input {
    Empty,
    Typing,
    StopTyping,
    Participants,
    Send(Frame),
}

fn parse_input(line: &str) -> anyhow::Result<Input> {
    let line = line.trim();
    Ok(match line {
        "" => Input::Empty,
        "/typing" => Input::Typing,
        "/stop" => Input::StopTyping,
        "/participants" => Input::Participants,
        _ => {
            let value: Value = serde_json::from_str(line)?;
            Input::Send(Frame::from_value(value)?)
        },
    })
}

/// Open the channel and stream until Ctrl-C, a normal server close, or
/// reconnect failure.
pub(crate) async fn run_watch(config: &Config, args: WatchArgs) -> anyhow::Result<()> {
    let mut endpoint = Endpoint::new(&config.server.base_url, args.path)?;
    if let Some(param) = &args.param {
        endpoint = endpoint.with_param(param.clone());
    }

    let channel = Arc::new(
        Channel::websocket(endpoint)
            .with_config(config_bridge::channel_config(config))
            .with_credentials(config_bridge::credentials(config)),
    );

    channel.on_state_change(|change| eprintln!("{}", Theme::state_change(change)));

    let types = if args.types.is_empty() {
        INBOUND_TYPES.iter().map(|t| (*t).to_owned()).collect()
    } else {
        args.types
    };
    for frame_type in types {
        channel.on_frame(frame_type, |frame| {
            println!("{}", frame.to_value());
            Ok(())
        });
    }

    let mut typing = TypingCoordinator::new(Arc::clone(&channel) as Arc<dyn FrameSink>)
        .with_debounce(config.typing.debounce());
    if let Some(param) = args.param {
        typing = typing.with_context(json!({ "thread_id": param }));
    }

    channel.open()?;
    eprintln!(
        "{}",
        Theme::info("Streaming frames; type JSON frames, /typing, /stop or /participants")
    );

    let result = pump(&channel, &typing).await;

    if let Err(err) = typing.stop().await {
        debug!(error = %err, "typing_stop not sent on shutdown");
    }
    channel.close().await;
    result
}

async fn pump(channel: &Channel, typing: &TypingCoordinator) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut state = channel.watch_state();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                eprintln!("{}", Theme::info("Interrupted"));
                return Ok(());
            }

            line = lines.next_line(), if stdin_open => match line? {
                Some(line) => handle_line(channel, typing, &line).await,
                None => stdin_open = false,
            },

            changed = state.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let current = *state.borrow_and_update();
                match current {
                    ConnectionState::Failed => {
                        channel.wait_until_open().await?;
                    },
                    ConnectionState::Closed => {
                        eprintln!("{}", Theme::info("Server closed the channel"));
                        return Ok(());
                    },
                    _ => {},
                }
            }
        }
    }
}

async fn handle_line(channel: &Channel, typing: &TypingCoordinator, line: &str) {
    let result: anyhow::Result<()> = match parse_input(line) {
        Ok(Input::Empty) => Ok(()),
        Ok(Input::Typing) => typing.notify_activity().await.map_err(Into::into),
        Ok(Input::StopTyping) => typing.stop().await.map_err(Into::into),
        Ok(Input::Participants) => channel
            .send(Frame::get_participants())
            .await
            .map_err(Into::into),
        Ok(Input::Send(frame)) => channel.send(frame).await.map_err(Into::into),
        Err(err) => Err(err),
    };

    if let Err(err) = result {
        eprintln!("{}", Theme::warning(&err.to_string()));
    }
}
