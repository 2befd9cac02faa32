//! Message schemas for the engine's pub/sub boundary.
//!
//! Inbound messages arrive as raw envelopes pushed by the transport; the
//! engine validates them against the schemas here at the start of each tick.
//! Outbound messages are per-player envelopes published on `player:{uuid}`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ProtocolError;

/// Topic the gateway publishes authenticated joins on.
pub const TOPIC_JOIN_GAME: &str = "player:join_game";
/// Topic the gateway publishes cursor updates on.
pub const TOPIC_UPDATE_POSITION: &str = "player:update_position";

/// Maximum accepted username length, in characters.
pub const MAX_USERNAME_LEN: usize = 100;

/// Outbound topic for a specific player.
#[inline]
pub fn player_topic(uuid: &Uuid) -> String {
    format!("player:{uuid}")
}

/// `player:join_game` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinGame {
    pub uuid: Uuid,
    pub username: String,
}

/// `player:update_position` payload.
///
/// `(x, y)` is the cursor position in client pixel coordinates: `(0, 0)` is
/// the top-left of the viewport, y grows downward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UpdatePosition {
    pub uuid: Uuid,
    pub x: f64,
    pub y: f64,
}

/// A raw inbound message as handed over by the transport.
#[derive(Debug, Clone)]
pub struct InboundEnvelope {
    pub topic: String,
    pub payload: serde_json::Value,
}

/// Validated inbound message.
#[derive(Debug, Clone)]
pub enum ClientMessage {
    Join(JoinGame),
    UpdatePosition(UpdatePosition),
}

impl ClientMessage {
    /// Parse and validate a raw envelope.
    pub fn parse(envelope: InboundEnvelope) -> Result<Self, ProtocolError> {
        match envelope.topic.as_str() {
            TOPIC_JOIN_GAME => {
                let join: JoinGame = serde_json::from_value(envelope.payload).map_err(|source| {
                    ProtocolError::MalformedPayload {
                        topic: TOPIC_JOIN_GAME,
                        source,
                    }
                })?;
                if join.username.chars().count() > MAX_USERNAME_LEN {
                    return Err(ProtocolError::UsernameTooLong(MAX_USERNAME_LEN));
                }
                Ok(ClientMessage::Join(join))
            }
            TOPIC_UPDATE_POSITION => {
                let update: UpdatePosition =
                    serde_json::from_value(envelope.payload).map_err(|source| {
                        ProtocolError::MalformedPayload {
                            topic: TOPIC_UPDATE_POSITION,
                            source,
                        }
                    })?;
                Ok(ClientMessage::UpdatePosition(update))
            }
            other => Err(ProtocolError::UnknownTopic(other.to_string())),
        }
    }
}

/// An outbound message addressed to one player's topic.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub topic: String,
    pub message: ServerMessage,
}

/// Messages the engine publishes on `player:{uuid}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "method", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent once, in the tick the player's spawn succeeded.
    JoinGame(TickData),
    /// Sent every tick thereafter.
    TickUpdate(TickData),
}

impl ServerMessage {
    pub fn data(&self) -> &TickData {
        match self {
            ServerMessage::JoinGame(data) | ServerMessage::TickUpdate(data) => data,
        }
    }
}

/// Per-player view of the world after one tick.
///
/// All coordinates are world-frame; the gateway translates to screen space
/// using `com_x`/`com_y`.
#[derive(Debug, Clone, Serialize)]
pub struct TickData {
    pub com_x: f64,
    pub com_y: f64,
    pub self_blobs: Vec<SelfBlob>,
    pub zoom_factor: f64,
    /// Visible blobs of other players, keyed by `"{uuid}:{blob_index}"`.
    pub other_blobs: Vec<(String, BlobView)>,
    /// Visible food and viruses, keyed by `"{uuid}"`.
    pub world_objects: Vec<(String, WorldObjectView)>,
    /// Every other player touched during the visibility sweep; lets the
    /// client evict stale caches.
    pub player_metadata: Vec<Uuid>,
    pub world_radius: f64,
    /// Initial spawn location; present only on `join_game`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spawn: Option<SpawnPoint>,
}

/// World-frame spawn location included in `join_game`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpawnPoint {
    pub x: f64,
    pub y: f64,
}

/// One of the receiving player's own blobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SelfBlob {
    pub x: f64,
    pub y: f64,
    pub r: f64,
}

/// Another player's blob as seen by the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BlobView {
    pub x: f64,
    pub y: f64,
    pub r: f64,
    pub vx: f64,
    pub vy: f64,
}

/// A visible world object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WorldObjectView {
    #[serde(rename = "type")]
    pub kind: ObjectTag,
    pub x: f64,
    pub y: f64,
    pub r: f64,
}

/// World object discriminant on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectTag {
    Food,
    Virus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_join() {
        let uuid = Uuid::new_v4();
        let envelope = InboundEnvelope {
            topic: TOPIC_JOIN_GAME.to_string(),
            payload: json!({"uuid": uuid, "username": "blobby"}),
        };
        match ClientMessage::parse(envelope).unwrap() {
            ClientMessage::Join(join) => {
                assert_eq!(join.uuid, uuid);
                assert_eq!(join.username, "blobby");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_parse_update_position() {
        let uuid = Uuid::new_v4();
        let envelope = InboundEnvelope {
            topic: TOPIC_UPDATE_POSITION.to_string(),
            payload: json!({"uuid": uuid, "x": 1920.0, "y": 540.0}),
        };
        match ClientMessage::parse(envelope).unwrap() {
            ClientMessage::UpdatePosition(update) => {
                assert_eq!(update.x, 1920.0);
                assert_eq!(update.y, 540.0);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_payload_rejected() {
        let envelope = InboundEnvelope {
            topic: TOPIC_JOIN_GAME.to_string(),
            payload: json!({"uuid": "not-a-uuid", "username": 7}),
        };
        assert!(matches!(
            ClientMessage::parse(envelope),
            Err(ProtocolError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn test_unknown_topic_rejected() {
        let envelope = InboundEnvelope {
            topic: "player:teleport".to_string(),
            payload: json!({}),
        };
        assert!(matches!(
            ClientMessage::parse(envelope),
            Err(ProtocolError::UnknownTopic(_))
        ));
    }

    #[test]
    fn test_username_length_limit() {
        let envelope = InboundEnvelope {
            topic: TOPIC_JOIN_GAME.to_string(),
            payload: json!({"uuid": Uuid::new_v4(), "username": "x".repeat(MAX_USERNAME_LEN + 1)}),
        };
        assert!(matches!(
            ClientMessage::parse(envelope),
            Err(ProtocolError::UsernameTooLong(_))
        ));
    }

    #[test]
    fn test_tick_update_wire_shape() {
        let message = ServerMessage::TickUpdate(TickData {
            com_x: 1.0,
            com_y: -2.0,
            self_blobs: vec![SelfBlob {
                x: 1.0,
                y: -2.0,
                r: 20.0,
            }],
            zoom_factor: 0.06,
            other_blobs: vec![(
                format!("{}:0", Uuid::nil()),
                BlobView {
                    x: 50.0,
                    y: 0.0,
                    r: 20.0,
                    vx: 0.0,
                    vy: 0.0,
                },
            )],
            world_objects: vec![(
                Uuid::nil().to_string(),
                WorldObjectView {
                    kind: ObjectTag::Food,
                    x: 3.0,
                    y: 4.0,
                    r: 5.0,
                },
            )],
            player_metadata: vec![Uuid::nil()],
            world_radius: 300.0,
            spawn: None,
        });

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["method"], "tick_update");
        assert_eq!(value["data"]["com_x"], 1.0);
        assert_eq!(value["data"]["world_objects"][0][1]["type"], "food");
        // The spawn marker only appears on join_game.
        assert!(value["data"].get("spawn").is_none());
    }

    #[test]
    fn test_join_game_carries_spawn() {
        let message = ServerMessage::JoinGame(TickData {
            com_x: 0.0,
            com_y: 0.0,
            self_blobs: vec![],
            zoom_factor: 0.06,
            other_blobs: vec![],
            world_objects: vec![],
            player_metadata: vec![],
            world_radius: 300.0,
            spawn: Some(SpawnPoint { x: 10.0, y: -4.0 }),
        });
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["method"], "join_game");
        assert_eq!(value["data"]["spawn"]["x"], 10.0);
    }
}
