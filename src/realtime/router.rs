//! # Message Router
//!
//! The per-connection state machine of the room protocol.
//!
//! ```text
//!            join_room               leave_room / disconnect
//! unjoined ────────────► in_room ─────────────────────────► unjoined
//!     │                     │
//!     └──── disconnect ─────┴──► removed
//! ```
//!
//! ## Dispatch model:
//! [`MessageRouter::dispatch`] is synchronous and handles every message that only
//! touches in-memory state. A `translate` without a client-supplied translation returns
//! [`Dispatch::Translate`]; the caller runs [`MessageRouter::complete_translation`] on
//! its own task, so no lock is held while the upstream call is outstanding.

use super::protocol::{parse_inbound, ClientMessage, Inbound, ServerMessage, INVALID_FORMAT};
use super::registry::{ConnectionRegistry, Role, Transport};
use super::rooms::RoomDirectory;
use crate::translation::TranslationOrchestrator;
use chrono::Utc;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const WELCOME_MESSAGE: &str = "✅ Connected to DashkaChat!";

/// Display name used when a sender never joined with one.
pub const ANONYMOUS: &str = "Anonymous";

const MISSING_JOIN_FIELDS: &str = "Room and username are required";

/// Outcome of dispatching one inbound frame.
#[derive(Debug, PartialEq)]
pub enum Dispatch {
    /// Fully handled
    Done,
    /// Needs a server-side translation before anything can be broadcast
    Translate(PendingTranslation),
}

/// A `translate` message waiting for the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTranslation {
    pub sender_id: String,
    pub original: String,
    pub from: String,
    pub to: String,
}

pub struct MessageRouter {
    registry: Arc<ConnectionRegistry>,
    rooms: Arc<RoomDirectory>,
    orchestrator: Arc<TranslationOrchestrator>,
}

impl MessageRouter {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        rooms: Arc<RoomDirectory>,
        orchestrator: Arc<TranslationOrchestrator>,
    ) -> Self {
        Self {
            registry,
            rooms,
            orchestrator,
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn rooms(&self) -> &RoomDirectory {
        &self.rooms
    }

    /// Register a new transport and greet it; returns the connection id.
    pub fn connect(&self, transport: Arc<dyn Transport>) -> String {
        let id = self.registry.add(transport);
        self.registry.send_to(
            &id,
            &ServerMessage::Welcome {
                client_id: id.clone(),
                message: WELCOME_MESSAGE.to_string(),
                timestamp: Utc::now(),
            },
        );
        id
    }

    /// Leave the current room (if any), then forget the connection.
    pub fn disconnect(&self, connection_id: &str) {
        if let Some(room) = self.registry.get(connection_id).and_then(|c| c.room) {
            self.leave_room(connection_id, &room);
        }
        self.registry.remove(connection_id);
    }

    /// Handle one inbound text frame.
    pub fn dispatch(&self, connection_id: &str, raw: &str) -> Dispatch {
        let message = match parse_inbound(raw) {
            Ok(Inbound::Known(message)) => message,
            Ok(Inbound::Unknown(fields)) => {
                self.relay_unknown(connection_id, fields);
                return Dispatch::Done;
            }
            Err(e) => {
                debug!(connection_id = %connection_id, error = %e, "Rejected inbound frame");
                self.registry.send_to(connection_id, &ServerMessage::error(INVALID_FORMAT));
                return Dispatch::Done;
            }
        };

        match message {
            ClientMessage::JoinRoom { room, username } => {
                self.join_room(connection_id, room, username);
                Dispatch::Done
            }
            ClientMessage::LeaveRoom {} => {
                match self.registry.get(connection_id).and_then(|c| c.room) {
                    Some(room) => self.leave_room(connection_id, &room),
                    None => debug!(connection_id = %connection_id, "leave_room outside a room ignored"),
                }
                Dispatch::Done
            }
            ClientMessage::SetRole { role } => {
                let role = Role::from_label(&role);
                self.registry.set_role(connection_id, role.clone());
                info!(connection_id = %connection_id, role = %role.as_str(), "Role set");
                self.registry.send_to(
                    connection_id,
                    &ServerMessage::RoleConfirmed {
                        role: role.as_str().to_string(),
                        timestamp: Utc::now(),
                    },
                );
                Dispatch::Done
            }
            ClientMessage::Translate {
                original,
                translation: Some(translation),
                from,
                to,
            } => {
                self.deliver_translation(connection_id, original, translation, from, to);
                Dispatch::Done
            }
            ClientMessage::Translate {
                original,
                translation: None,
                from,
                to,
            } => Dispatch::Translate(PendingTranslation {
                sender_id: connection_id.to_string(),
                original,
                from,
                to,
            }),
        }
    }

    /// Translate a pending message and broadcast it; errors go to the sender only.
    pub async fn complete_translation(&self, pending: PendingTranslation) {
        let result = self
            .orchestrator
            .translate_text(&pending.original, &pending.from, &pending.to)
            .await;

        match result {
            Ok(result) => self.deliver_translation(
                &pending.sender_id,
                result.original_text,
                result.translated_text,
                result.source_language,
                result.target_language,
            ),
            Err(e) => {
                warn!(connection_id = %pending.sender_id, error = %e, "Server-side translation failed");
                self.registry.send_to(&pending.sender_id, &ServerMessage::error(e.to_string()));
            }
        }
    }

    fn join_room(&self, connection_id: &str, room: Option<String>, username: Option<String>) {
        // Room codes are opaque keys and used exactly as sent
        let room = room.filter(|room| !room.is_empty());
        let username = username.map(|name| name.trim().to_string()).filter(|name| !name.is_empty());
        let (room, username) = match (room, username) {
            (Some(room), Some(username)) => (room, username),
            _ => {
                self.registry.send_to(connection_id, &ServerMessage::error(MISSING_JOIN_FIELDS));
                return;
            }
        };

        let Some(connection) = self.registry.get(connection_id) else {
            warn!(connection_id = %connection_id, "join_room from unregistered connection");
            return;
        };
        if let Some(previous) = connection.room.filter(|previous| previous != &room) {
            self.leave_room(connection_id, &previous);
        }

        let outcome = self.rooms.join(connection_id, &room, &username);
        if outcome.newly_joined {
            self.rooms.broadcast(
                &room,
                &ServerMessage::UserJoined {
                    username,
                    participants: outcome.participants,
                },
                Some(connection_id),
            );
        }
        self.registry.send_to(
            connection_id,
            &ServerMessage::RoomJoined {
                room,
                participants: outcome.participants,
            },
        );
    }

    fn leave_room(&self, connection_id: &str, room: &str) {
        let Some(outcome) = self.rooms.leave(connection_id, room) else {
            return;
        };
        if !outcome.room_removed {
            self.rooms.broadcast(
                room,
                &ServerMessage::UserLeft {
                    username: outcome.display_name.unwrap_or_else(|| ANONYMOUS.to_string()),
                    participants: outcome.remaining,
                },
                None,
            );
        }
    }

    /// Broadcast a finished translation from `sender_id` to its audience: the sender's
    /// room if it is in one, otherwise every other connection.
    fn deliver_translation(
        &self,
        sender_id: &str,
        original: String,
        translation: String,
        from: String,
        to: String,
    ) {
        let Some(sender) = self.registry.get(sender_id) else {
            debug!(connection_id = %sender_id, "Sender disconnected before delivery, dropping translation");
            return;
        };

        let message = ServerMessage::Translation {
            username: sender.display_name.unwrap_or_else(|| ANONYMOUS.to_string()),
            original,
            translation,
            from,
            to,
            timestamp: Utc::now(),
        };

        let sent = match sender.room {
            Some(room) => self.rooms.broadcast(&room, &message, Some(sender_id)),
            None => self.registry.broadcast_to_others(sender_id, &message),
        };
        debug!(connection_id = %sender_id, sent = sent, "Translation delivered");
    }

    /// Relay a message of unknown type to everyone else, tagged with its sender.
    fn relay_unknown(&self, sender_id: &str, mut fields: Map<String, Value>) {
        fields.insert("sender_id".to_string(), json!(sender_id));
        fields.insert("timestamp".to_string(), json!(Utc::now()));
        let sent = self.registry.broadcast_to_others(sender_id, &Value::Object(fields));
        debug!(connection_id = %sender_id, sent = sent, "Relayed message of unknown type");
    }
}
