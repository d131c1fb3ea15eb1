//! # Realtime Rooms
//!
//! The WebSocket side of the server:
//! - `registry`: every live connection and its transport
//! - `rooms`: named broadcast groups
//! - `protocol`: the JSON messages on the wire
//! - `router`: the per-connection state machine
//! - `socket`: the actix actor and `/ws` endpoint

pub mod protocol;
pub mod registry;
pub mod rooms;
pub mod router;
pub mod socket;

#[cfg(test)]
pub mod testing;

pub use registry::ConnectionRegistry;
pub use rooms::RoomDirectory;
pub use router::MessageRouter;
