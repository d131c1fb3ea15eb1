//! # Room Directory
//!
//! Named broadcast groups. A room exists exactly while it has members: it is created by
//! the first join naming it and removed by the leave that empties it.
//!
//! Membership changes are mirrored into the [`ConnectionRegistry`] (room code and
//! display name) under the room lock, so a connection's `room` is set iff it is listed
//! in that room. Lock order is always rooms → registry.

use super::registry::{encode, fan_out, ConnectionRegistry};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    /// Member count after the join
    pub participants: usize,
    /// False when the connection was already in the room
    pub newly_joined: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveOutcome {
    pub remaining: usize,
    pub room_removed: bool,
    pub display_name: Option<String>,
}

pub struct RoomDirectory {
    /// Room code → member ids in join order
    rooms: RwLock<HashMap<String, Vec<String>>>,
    registry: Arc<ConnectionRegistry>,
}

impl RoomDirectory {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            registry,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Vec<String>>> {
        self.rooms.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Vec<String>>> {
        self.rooms.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a connection to a room, creating the room if needed.
    ///
    /// Joining a room the connection is already in changes nothing but the display name.
    pub fn join(&self, connection_id: &str, room_code: &str, display_name: &str) -> JoinOutcome {
        let mut rooms = self.write();
        let members = rooms.entry(room_code.to_string()).or_default();

        let newly_joined = !members.iter().any(|id| id == connection_id);
        if newly_joined {
            members.push(connection_id.to_string());
        }
        let participants = members.len();
        self.registry.set_room(connection_id, room_code, display_name);

        if newly_joined {
            info!(
                connection_id = %connection_id,
                room = %room_code,
                username = %display_name,
                participants = participants,
                "Joined room"
            );
        }
        JoinOutcome {
            participants,
            newly_joined,
        }
    }

    /// Remove a connection from a room; deletes the room when it becomes empty.
    ///
    /// Returns `None` if the connection was not a member.
    pub fn leave(&self, connection_id: &str, room_code: &str) -> Option<LeaveOutcome> {
        let mut rooms = self.write();
        let members = rooms.get_mut(room_code)?;
        let position = members.iter().position(|id| id == connection_id)?;
        members.remove(position);

        let remaining = members.len();
        let room_removed = remaining == 0;
        if room_removed {
            rooms.remove(room_code);
            info!(room = %room_code, "Room removed (empty)");
        }

        let display_name = self.registry.get(connection_id).and_then(|c| c.display_name);
        self.registry.clear_room(connection_id);

        info!(connection_id = %connection_id, room = %room_code, remaining = remaining, "Left room");
        Some(LeaveOutcome {
            remaining,
            room_removed,
            display_name,
        })
    }

    pub fn members_of(&self, room_code: &str) -> Vec<String> {
        self.read().get(room_code).cloned().unwrap_or_default()
    }

    pub fn member_count(&self, room_code: &str) -> usize {
        self.read().get(room_code).map_or(0, Vec::len)
    }

    pub fn room_count(&self) -> usize {
        self.read().len()
    }

    /// Send to every member of a room except `exclude`; returns the number delivered.
    ///
    /// Delivery is best effort: failed sends are logged and skipped.
    pub fn broadcast<M: Serialize + ?Sized>(
        &self,
        room_code: &str,
        message: &M,
        exclude: Option<&str>,
    ) -> usize {
        let members: Vec<String> = self
            .members_of(room_code)
            .into_iter()
            .filter(|id| Some(id.as_str()) != exclude)
            .collect();
        if members.is_empty() {
            return 0;
        }
        let Some(payload) = encode(message) else {
            return 0;
        };

        let targets = self.registry.transports_for(&members);
        let sent = fan_out(&targets, &payload);
        debug!(room = %room_code, recipients = members.len(), sent = sent, "Room broadcast");
        sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::testing::RecordingTransport;
    use serde_json::json;

    fn setup() -> (Arc<ConnectionRegistry>, RoomDirectory) {
        let registry = Arc::new(ConnectionRegistry::new());
        let rooms = RoomDirectory::new(registry.clone());
        (registry, rooms)
    }

    #[test]
    fn test_sole_member_leave_removes_room() {
        let (registry, rooms) = setup();
        let id = registry.add(RecordingTransport::new());

        let joined = rooms.join(&id, "ABC123", "Alice");
        assert_eq!(joined, JoinOutcome { participants: 1, newly_joined: true });
        assert_eq!(registry.get(&id).unwrap().room.as_deref(), Some("ABC123"));

        let left = rooms.leave(&id, "ABC123").unwrap();
        assert!(left.room_removed);
        assert_eq!(left.display_name.as_deref(), Some("Alice"));
        assert_eq!(rooms.room_count(), 0);
        assert!(registry.get(&id).unwrap().room.is_none());
    }

    #[test]
    fn test_rejoin_is_idempotent() {
        let (registry, rooms) = setup();
        let id = registry.add(RecordingTransport::new());

        rooms.join(&id, "R1", "Alice");
        let again = rooms.join(&id, "R1", "Alice");

        assert_eq!(again, JoinOutcome { participants: 1, newly_joined: false });
        assert_eq!(rooms.members_of("R1"), vec![id]);
    }

    #[test]
    fn test_members_keep_join_order() {
        let (registry, rooms) = setup();
        let ids: Vec<String> = (0..3).map(|_| registry.add(RecordingTransport::new())).collect();
        for (i, id) in ids.iter().enumerate() {
            rooms.join(id, "R", &format!("user{}", i));
        }
        rooms.leave(&ids[1], "R");

        assert_eq!(rooms.members_of("R"), vec![ids[0].clone(), ids[2].clone()]);
        assert_eq!(rooms.member_count("R"), 2);
    }

    #[test]
    fn test_leave_by_non_member() {
        let (registry, rooms) = setup();
        let id = registry.add(RecordingTransport::new());
        assert!(rooms.leave(&id, "nowhere").is_none());

        let other = registry.add(RecordingTransport::new());
        rooms.join(&other, "R", "Bob");
        assert!(rooms.leave(&id, "R").is_none());
        assert_eq!(rooms.member_count("R"), 1);
    }

    #[test]
    fn test_broadcast_excludes_sender_and_survives_closed_member() {
        let (registry, rooms) = setup();
        let transports: Vec<_> = (0..4).map(|_| RecordingTransport::new()).collect();
        let ids: Vec<String> = transports.iter().map(|t| registry.add(t.clone())).collect();
        for id in &ids {
            rooms.join(id, "R", "user");
        }

        let sent = rooms.broadcast("R", &json!({"type": "hello"}), Some(&ids[0]));
        assert_eq!(sent, 3);
        assert!(transports[0].messages().is_empty());

        transports[1].close();
        let sent = rooms.broadcast("R", &json!({"type": "again"}), Some(&ids[0]));
        assert_eq!(sent, 2);
        assert_eq!(transports[2].messages().len(), 2);
        assert_eq!(transports[3].messages().len(), 2);
    }

    #[test]
    fn test_concurrent_join_leave_broadcast() {
        let (registry, rooms) = setup();
        let rooms = Arc::new(rooms);
        let listener = RecordingTransport::new();
        let listener_id = registry.add(listener.clone());
        rooms.join(&listener_id, "R", "listener");

        let workers: Vec<_> = (0..8)
            .map(|worker| {
                let registry = registry.clone();
                let rooms = rooms.clone();
                std::thread::spawn(move || {
                    let id = registry.add(RecordingTransport::new());
                    for round in 0..50 {
                        rooms.join(&id, "R", &format!("worker{}", worker));
                        rooms.broadcast("R", &json!({"from": worker, "round": round}), Some(&id));
                        rooms.leave(&id, "R");
                        rooms.join(&id, &format!("solo{}", worker), "alone");
                        rooms.leave(&id, &format!("solo{}", worker));
                    }
                    registry.remove(&id);
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(rooms.members_of("R"), vec![listener_id.clone()]);
        assert_eq!(rooms.room_count(), 1);
        assert_eq!(registry.len(), 1);

        let mut received: Vec<(u64, u64)> = listener
            .messages()
            .iter()
            .map(|m| (m["from"].as_u64().unwrap(), m["round"].as_u64().unwrap()))
            .collect();
        assert_eq!(received.len(), 8 * 50);
        received.sort_unstable();
        received.dedup();
        assert_eq!(received.len(), 8 * 50);
    }

    #[test]
    fn test_broadcast_to_unknown_room() {
        let (_, rooms) = setup();
        assert_eq!(rooms.broadcast("missing", &json!({}), None), 0);
    }
}
