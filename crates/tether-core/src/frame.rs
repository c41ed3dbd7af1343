//! Typed frames and their JSON text encoding.
//!
//! On the wire a frame is a JSON object with a string `type` field. The
//! rest of the object is the payload; the core never looks inside it.
//!
//! ```json
//! {"type": "session_started", "session": {"id": "s1"}}
//! ```
//!
//! Decoding strips `type` (and `timestamp`, when it parses as RFC 3339 or
//! epoch milliseconds) and keeps the remaining fields as the payload.
//! Encoding flattens an object payload next to `type` and `timestamp`; any
//! other payload is written under a `payload` key.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::error::FrameError;

/// Field carrying the dispatch discriminant.
pub const TYPE_KEY: &str = "type";

/// Field carrying the frame timestamp.
pub const TIMESTAMP_KEY: &str = "timestamp";

/// Field used for non-object payloads on encode.
pub const PAYLOAD_KEY: &str = "payload";

/// Well-known frame type tags.
pub mod frame_type {
    // Outbound
    /// Client keepalive.
    pub const PING: &str = "ping";
    /// Reply to a server `ping`.
    pub const PONG: &str = "pong";
    /// Local user started typing.
    pub const TYPING_START: &str = "typing_start";
    /// Local user stopped typing.
    pub const TYPING_STOP: &str = "typing_stop";
    /// Ask the server for the participant list.
    pub const GET_PARTICIPANTS: &str = "get_participants";

    // Inbound
    /// Discovery session started.
    pub const SESSION_STARTED: &str = "session_started";
    /// A patch was scanned.
    pub const PATCH_SCANNED: &str = "patch_scanned";
    /// Progress report for a running session.
    pub const PROGRESS_UPDATE: &str = "progress_update";
    /// Discovery session finished.
    pub const SESSION_COMPLETED: &str = "session_completed";
    /// Kernel is ready.
    pub const KERNEL_READY: &str = "kernel_ready";
    /// Server-side error report.
    pub const ERROR: &str = "error";
    /// A comment was posted.
    pub const NEW_COMMENT: &str = "new_comment";
    /// A comment was edited.
    pub const COMMENT_UPDATED: &str = "comment_updated";
    /// A thread was changed.
    pub const THREAD_UPDATED: &str = "thread_updated";
    /// A participant joined.
    pub const USER_JOINED: &str = "user_joined";
    /// A participant left.
    pub const USER_LEFT: &str = "user_left";
    /// A participant is typing.
    pub const TYPING_INDICATOR: &str = "typing_indicator";
    /// Participant list.
    pub const PARTICIPANTS: &str = "participants";
    /// Server heartbeat.
    pub const HEARTBEAT: &str = "heartbeat";
}

/// One typed unit exchanged over a channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Dispatch discriminant.
    pub frame_type: String,
    /// Type-specific body. Opaque to the core.
    pub payload: Value,
    /// When the frame was created (outbound) or stamped by the server.
    pub timestamp: DateTime<Utc>,
}

impl Frame {
    /// Create a frame stamped with the current time.
    pub fn new(frame_type: impl Into<String>, payload: Value) -> Self {
        Self {
            frame_type: frame_type.into(),
            payload,
            timestamp: Utc::now(),
        }
    }

    /// Create a frame with an empty object payload.
    pub fn empty(frame_type: impl Into<String>) -> Self {
        Self::new(frame_type, Value::Object(Map::new()))
    }

    /// Keepalive ping.
    #[must_use]
    pub fn ping() -> Self {
        Self::empty(frame_type::PING)
    }

    /// Reply to a server ping.
    #[must_use]
    pub fn pong() -> Self {
        Self::empty(frame_type::PONG)
    }

    /// Typing started, with optional context (e.g. a thread id).
    #[must_use]
    pub fn typing_start(context: Option<Value>) -> Self {
        Self::new(frame_type::TYPING_START, context.unwrap_or_else(empty_object))
    }

    /// Typing stopped, with optional context.
    #[must_use]
    pub fn typing_stop(context: Option<Value>) -> Self {
        Self::new(frame_type::TYPING_STOP, context.unwrap_or_else(empty_object))
    }

    /// Participant list request.
    #[must_use]
    pub fn get_participants() -> Self {
        Self::empty(frame_type::GET_PARTICIPANTS)
    }

    /// Override the timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Whether this frame carries the given type tag.
    #[must_use]
    pub fn is(&self, frame_type: &str) -> bool {
        self.frame_type == frame_type
    }

    /// Decode a frame from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError`] if the text is not a JSON object with a
    /// non-empty string `type` field.
    pub fn decode(text: &str) -> Result<Self, FrameError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Decode a frame from an already-parsed JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError`] if the value is not an object with a
    /// non-empty string `type` field.
    pub fn from_value(value: Value) -> Result<Self, FrameError> {
        let Value::Object(mut map) = value else {
            return Err(FrameError::NotAnObject);
        };

        let frame_type = match map.remove(TYPE_KEY) {
            Some(Value::String(t)) if !t.is_empty() => t,
            Some(_) => return Err(FrameError::InvalidType),
            None => return Err(FrameError::MissingType),
        };

        // Only claim `timestamp` when it parses; otherwise it belongs to the payload.
        let timestamp = match map.get(TIMESTAMP_KEY).and_then(parse_timestamp) {
            Some(ts) => {
                map.remove(TIMESTAMP_KEY);
                ts
            },
            None => Utc::now(),
        };

        Ok(Self {
            frame_type,
            payload: Value::Object(map),
            timestamp,
        })
    }

    /// Wire representation as a JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = match &self.payload {
            Value::Object(fields) => fields.clone(),
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert(PAYLOAD_KEY.to_owned(), other.clone());
                map
            },
        };
        map.insert(TYPE_KEY.to_owned(), Value::String(self.frame_type.clone()));
        map.insert(
            TIMESTAMP_KEY.to_owned(),
            Value::String(self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        Value::Object(map)
    }

    /// Encode the frame as JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Json`] if serialization fails.
    pub fn encode(&self) -> Result<String, FrameError> {
        Ok(serde_json::to_string(&self.to_value())?)
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|ts| ts.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}
