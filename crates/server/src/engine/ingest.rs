//! Inbound message ingestion.
//!
//! Transport threads push raw envelopes onto a bounded queue; the engine
//! drains it at the start of each tick. Malformed payloads are logged and
//! discarded without a reply, since the sender is the trusted gateway.

use protocol::{ClientMessage, InboundEnvelope};
use tokio::sync::mpsc;
use tracing::warn;

/// Receiving end of the transport → engine queue.
#[derive(Debug)]
pub struct IngestQueue {
    rx: mpsc::Receiver<InboundEnvelope>,
}

impl IngestQueue {
    pub fn new(capacity: usize) -> (mpsc::Sender<InboundEnvelope>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self { rx })
    }

    /// Drain everything queued since the previous tick, in arrival order.
    pub fn drain(&mut self) -> Vec<ClientMessage> {
        let mut messages = Vec::new();
        while let Ok(envelope) = self.rx.try_recv() {
            match ClientMessage::parse(envelope) {
                Ok(message) => messages.push(message),
                Err(err) => warn!("discarding inbound message: {err}"),
            }
        }
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{TOPIC_JOIN_GAME, TOPIC_UPDATE_POSITION};
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn test_drain_preserves_arrival_order() {
        let (tx, mut queue) = IngestQueue::new(16);
        let uuid = Uuid::new_v4();
        tx.try_send(InboundEnvelope {
            topic: TOPIC_JOIN_GAME.to_string(),
            payload: json!({"uuid": uuid, "username": "a"}),
        })
        .unwrap();
        for x in [10.0, 20.0] {
            tx.try_send(InboundEnvelope {
                topic: TOPIC_UPDATE_POSITION.to_string(),
                payload: json!({"uuid": uuid, "x": x, "y": 0.0}),
            })
            .unwrap();
        }

        let drained = queue.drain();
        assert_eq!(drained.len(), 3);
        assert!(matches!(drained[0], ClientMessage::Join(_)));
        match &drained[2] {
            ClientMessage::UpdatePosition(update) => assert_eq!(update.x, 20.0),
            other => panic!("unexpected message: {other:?}"),
        }
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_malformed_payloads_are_dropped() {
        let (tx, mut queue) = IngestQueue::new(16);
        tx.try_send(InboundEnvelope {
            topic: TOPIC_JOIN_GAME.to_string(),
            payload: json!({"nope": true}),
        })
        .unwrap();
        tx.try_send(InboundEnvelope {
            topic: "player:fly".to_string(),
            payload: json!({}),
        })
        .unwrap();

        assert!(queue.drain().is_empty());
    }
}
