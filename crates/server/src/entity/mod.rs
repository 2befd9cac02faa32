//! Game entities.
//!
//! Players own their blobs; food and viruses are free-standing world
//! objects. The grid references everything through [`EntityHandle`].

mod blob;
mod object;
mod player;

pub use blob::Blob;
pub use object::{ObjectKind, WorldObject};
pub use player::Player;

use uuid::Uuid;

/// Stable, tagged identifier for an entity. These are the values stored in
/// grid cells; they never own the entity they name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityHandle {
    /// One blob of a player.
    Blob { player: Uuid, index: u32 },
    /// A food pellet or virus.
    Object { id: Uuid },
}

impl EntityHandle {
    /// Wire identifier: `"{uuid}:{blob_index}"` for blobs, `"{uuid}"` for
    /// world objects. Only the outbound message layer calls this.
    pub fn wire_id(&self) -> String {
        match self {
            EntityHandle::Blob { player, index } => format!("{player}:{index}"),
            EntityHandle::Object { id } => id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_id_formats() {
        let player = Uuid::new_v4();
        let handle = EntityHandle::Blob { player, index: 3 };
        assert_eq!(handle.wire_id(), format!("{player}:3"));

        let id = Uuid::new_v4();
        let handle = EntityHandle::Object { id };
        assert_eq!(handle.wire_id(), id.to_string());
    }
}
