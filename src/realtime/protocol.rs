//! # Room Protocol
//!
//! JSON messages exchanged over `/ws`, discriminated by their `type` field.
//!
//! ## Client → Server:
//! - `join_room {room, username}`
//! - `leave_room {}`
//! - `set_role {role}`
//! - `translate {original, translation?, from, to}` (`translation` accepted as the type
//!   name for older clients); without a `translation` field the server translates
//!
//! ## Server → Client:
//! - `welcome`, `room_joined`, `user_joined`, `user_left`, `role_confirmed`,
//!   `translation`, `error`
//!
//! Messages with any other `type` are not errors: they are relayed verbatim to the
//! other connections (see [`Inbound::Unknown`]).

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Reply text for unparseable payloads.
pub const INVALID_FORMAT: &str = "Invalid message format";

/// Type names handled by the router itself.
const KNOWN_TYPES: &[&str] = &["join_room", "leave_room", "set_role", "translate", "translation"];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Fields are optional here so that missing ones get a specific error reply
    JoinRoom {
        #[serde(default, deserialize_with = "string_or_none")]
        room: Option<String>,
        #[serde(default, deserialize_with = "string_or_none")]
        username: Option<String>,
    },
    LeaveRoom {},
    SetRole {
        #[serde(default)]
        role: String,
    },
    #[serde(alias = "translation")]
    Translate {
        original: String,
        /// Already-translated text; absent when the server should translate
        #[serde(default)]
        translation: Option<String>,
        #[serde(default)]
        from: String,
        #[serde(default)]
        to: String,
    },
}

/// Any non-string value reads as absent.
fn string_or_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => Some(text),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        client_id: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
    RoomJoined {
        room: String,
        participants: usize,
    },
    UserJoined {
        username: String,
        participants: usize,
    },
    UserLeft {
        username: String,
        participants: usize,
    },
    RoleConfirmed {
        role: String,
        timestamp: DateTime<Utc>,
    },
    Translation {
        username: String,
        original: String,
        translation: String,
        from: String,
        to: String,
        timestamp: DateTime<Utc>,
    },
    Error {
        message: String,
    },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}

/// A parsed inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Known(ClientMessage),
    /// Well-formed object with a `type` the router does not handle
    Unknown(Map<String, Value>),
}

/// Parse one text frame.
///
/// Anything that is not a JSON object with a string `type`, or a known type whose
/// fields do not fit, is a `ProtocolError`.
pub fn parse_inbound(raw: &str) -> Result<Inbound, AppError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|_| AppError::ProtocolError(INVALID_FORMAT.to_string()))?;

    let kind = match value.get("type").and_then(Value::as_str) {
        Some(kind) => kind,
        None => return Err(AppError::ProtocolError(INVALID_FORMAT.to_string())),
    };

    if KNOWN_TYPES.contains(&kind) {
        serde_json::from_value(value)
            .map(Inbound::Known)
            .map_err(|_| AppError::ProtocolError(INVALID_FORMAT.to_string()))
    } else {
        match value {
            Value::Object(map) => Ok(Inbound::Unknown(map)),
            _ => Err(AppError::ProtocolError(INVALID_FORMAT.to_string())),
        }
    }
}
