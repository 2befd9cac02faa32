//! Shared protocol crate for the petri arena server.
//!
//! This crate contains:
//! - Inbound payload schemas consumed by the tick engine
//! - Outbound envelope and tick-update payloads
//! - Topic naming helpers
//!
//! The tick engine emits world-frame coordinates plus each player's center
//! of mass; the session gateway owns the world-to-screen transform.

mod error;
mod messages;

pub use error::ProtocolError;
pub use messages::{
    player_topic, BlobView, ClientMessage, Envelope, InboundEnvelope, JoinGame, ObjectTag,
    SelfBlob, ServerMessage, SpawnPoint, TickData, UpdatePosition, WorldObjectView,
    MAX_USERNAME_LEN, TOPIC_JOIN_GAME, TOPIC_UPDATE_POSITION,
};
