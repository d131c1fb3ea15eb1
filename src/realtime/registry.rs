//! # Connection Registry
//!
//! Tracks every live connection: its id, role, room, display name and the transport
//! used to reach it.
//!
//! ## Locking:
//! One `RwLock` guards the whole table. Sends never happen under the lock: fan-out
//! takes a snapshot of the transports, drops the guard, then sends. A poisoned lock is
//! recovered rather than propagated, so a panicking handler cannot take the registry
//! down with it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, error, info, warn};

/// Reason a send to a transport failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The peer is gone
    Closed,
    /// The outbound queue is full
    Full,
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Closed => write!(f, "transport closed"),
            SendError::Full => write!(f, "transport queue full"),
        }
    }
}

impl std::error::Error for SendError {}

/// Outbound half of a connection. Sends must not block.
pub trait Transport: Send + Sync {
    fn is_open(&self) -> bool;
    fn send_text(&self, text: &str) -> Result<(), SendError>;
}

/// Role announced by a client through `set_role`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Role {
    #[default]
    Unassigned,
    /// Client-supplied label (`speaker`, `listener`, ...)
    Participant(String),
}

impl Role {
    /// Blank labels leave the role unassigned.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        if label.is_empty() {
            Role::Unassigned
        } else {
            Role::Participant(label.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::Unassigned => "unknown",
            Role::Participant(label) => label,
        }
    }
}

/// One live connection.
#[derive(Clone)]
pub struct Connection {
    pub id: String,
    pub role: Role,
    /// Set iff the connection is a member of exactly one room
    pub room: Option<String>,
    pub display_name: Option<String>,
    pub connected_at: DateTime<Utc>,
    transport: Arc<dyn Transport>,
}

impl Connection {
    pub fn transport(&self) -> Arc<dyn Transport> {
        self.transport.clone()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("room", &self.room)
            .field("display_name", &self.display_name)
            .field("open", &self.transport.is_open())
            .finish()
    }
}

/// Serialize once, or log and give up.
pub(crate) fn encode<M: Serialize + ?Sized>(message: &M) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(text) => Some(text),
        Err(e) => {
            error!(error = %e, "Failed to serialize outbound message");
            None
        }
    }
}

/// Send to every open transport in `targets`; returns the number of successful sends.
pub(crate) fn fan_out(targets: &[(String, Arc<dyn Transport>)], payload: &str) -> usize {
    let mut sent = 0;
    for (id, transport) in targets {
        if !transport.is_open() {
            debug!(connection_id = %id, "Skipping closed transport");
            continue;
        }
        match transport.send_text(payload) {
            Ok(()) => sent += 1,
            Err(e) => warn!(connection_id = %id, error = %e, "Send failed, skipping recipient"),
        }
    }
    sent
}

#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<String, Connection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Connection>> {
        self.connections.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Connection>> {
        self.connections.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a freshly accepted transport; returns its new id.
    pub fn add(&self, transport: Arc<dyn Transport>) -> String {
        let id = format!("client_{}", uuid::Uuid::new_v4().simple());
        let connection = Connection {
            id: id.clone(),
            role: Role::Unassigned,
            room: None,
            display_name: None,
            connected_at: Utc::now(),
            transport,
        };

        let total = {
            let mut connections = self.write();
            connections.insert(id.clone(), connection);
            connections.len()
        };
        info!(connection_id = %id, total = total, "Connection registered");
        id
    }

    /// Remove a connection. Unknown ids are a no-op.
    pub fn remove(&self, id: &str) -> Option<Connection> {
        let removed = self.write().remove(id);
        if removed.is_some() {
            info!(connection_id = %id, total = self.len(), "Connection removed");
        }
        removed
    }

    pub fn get(&self, id: &str) -> Option<Connection> {
        self.read().get(id).cloned()
    }

    pub fn set_role(&self, id: &str, role: Role) -> bool {
        match self.write().get_mut(id) {
            Some(connection) => {
                connection.role = role;
                true
            }
            None => false,
        }
    }

    pub fn set_room(&self, id: &str, room: &str, display_name: &str) -> bool {
        match self.write().get_mut(id) {
            Some(connection) => {
                connection.room = Some(room.to_string());
                connection.display_name = Some(display_name.to_string());
                true
            }
            None => false,
        }
    }

    /// Forget the connection's room; returns the room it was in.
    pub fn clear_room(&self, id: &str) -> Option<String> {
        self.write().get_mut(id).and_then(|connection| connection.room.take())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Resolve the transports of `ids`, skipping unknown ones.
    pub fn transports_for(&self, ids: &[String]) -> Vec<(String, Arc<dyn Transport>)> {
        let connections = self.read();
        ids.iter()
            .filter_map(|id| connections.get(id).map(|c| (id.clone(), c.transport())))
            .collect()
    }

    pub fn send_to<M: Serialize + ?Sized>(&self, id: &str, message: &M) -> bool {
        let Some(transport) = self.read().get(id).map(Connection::transport) else {
            debug!(connection_id = %id, "Send to unknown connection dropped");
            return false;
        };
        let Some(payload) = encode(message) else {
            return false;
        };
        fan_out(&[(id.to_string(), transport)], &payload) == 1
    }

    /// Send to every connection except `sender_id`; returns the number delivered.
    pub fn broadcast_to_others<M: Serialize + ?Sized>(&self, sender_id: &str, message: &M) -> usize {
        let Some(payload) = encode(message) else {
            return 0;
        };
        let targets: Vec<_> = self
            .read()
            .values()
            .filter(|c| c.id != sender_id)
            .map(|c| (c.id.clone(), c.transport()))
            .collect();

        let sent = fan_out(&targets, &payload);
        debug!(sender = %sender_id, recipients = targets.len(), sent = sent, "Broadcast to all others");
        sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::testing::RecordingTransport;
    use serde_json::json;

    #[test]
    fn test_add_get_remove() {
        let registry = ConnectionRegistry::new();
        let id = registry.add(RecordingTransport::new());

        assert!(id.starts_with("client_"));
        let connection = registry.get(&id).unwrap();
        assert_eq!(connection.role, Role::Unassigned);
        assert!(connection.room.is_none());

        assert!(registry.remove(&id).is_some());
        assert!(registry.remove(&id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_role_and_room_updates() {
        let registry = ConnectionRegistry::new();
        let id = registry.add(RecordingTransport::new());

        assert!(registry.set_role(&id, Role::from_label("speaker")));
        assert!(registry.set_room(&id, "ABC123", "Alice"));
        let connection = registry.get(&id).unwrap();
        assert_eq!(connection.role.as_str(), "speaker");
        assert_eq!(connection.display_name.as_deref(), Some("Alice"));

        assert_eq!(registry.clear_room(&id).as_deref(), Some("ABC123"));
        assert!(registry.get(&id).unwrap().room.is_none());
        assert!(!registry.set_role("client_missing", Role::Unassigned));
        assert_eq!(Role::from_label("  ").as_str(), "unknown");
    }

    #[test]
    fn test_broadcast_to_others_skips_sender_and_closed() {
        let registry = ConnectionRegistry::new();
        let sender = RecordingTransport::new();
        let open = RecordingTransport::new();
        let closed = RecordingTransport::new();
        closed.close();

        let sender_id = registry.add(sender.clone());
        registry.add(open.clone());
        registry.add(closed.clone());

        let sent = registry.broadcast_to_others(&sender_id, &json!({"type": "ping"}));

        assert_eq!(sent, 1);
        assert!(sender.messages().is_empty());
        assert_eq!(open.messages().len(), 1);
        assert!(closed.messages().is_empty());
    }

    #[test]
    fn test_failed_send_does_not_stop_fan_out() {
        let registry = ConnectionRegistry::new();
        let failing = RecordingTransport::failing();
        let healthy = RecordingTransport::new();
        registry.add(failing);
        registry.add(healthy.clone());

        assert_eq!(registry.broadcast_to_others("nobody", &json!({"type": "x"})), 1);
        assert_eq!(healthy.messages().len(), 1);
    }

    #[test]
    fn test_send_to_unknown_connection() {
        let registry = ConnectionRegistry::new();
        assert!(!registry.send_to("client_missing", &json!({"type": "x"})));
    }
}
