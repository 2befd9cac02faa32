//! World state management.
//!
//! Owns every player and world object and keeps the spatial grid in sync
//! with their cell sets. The grid stores handles only; removal of an entity
//! scrubs every cell listed in its cell set.

use std::collections::HashMap;

use tracing::warn;
use uuid::Uuid;

use crate::bounds::Aabb;
use crate::entity::{EntityHandle, ObjectKind, Player, WorldObject};
use crate::placement::Placement;
use crate::spatial::SpatialGrid;

/// The game world: entity store plus spatial index.
#[derive(Debug)]
pub struct World {
    /// Half-extent of the square world, centered on the origin.
    pub radius: f64,
    pub players: HashMap<Uuid, Player>,
    pub objects: HashMap<Uuid, WorldObject>,
    pub grid: SpatialGrid,
}

impl World {
    pub fn new(radius: f64, grid_cell_size: f64) -> Self {
        Self {
            radius,
            players: HashMap::with_capacity(64),
            objects: HashMap::with_capacity(2048),
            grid: SpatialGrid::new(grid_cell_size),
        }
    }

    /// Insert a spawned player, indexing every blob's cell set.
    pub fn insert_player(&mut self, player: Player) {
        let id = player.id;
        for (index, blob) in player.blobs.iter().enumerate() {
            let handle = EntityHandle::Blob {
                player: id,
                index: index as u32,
            };
            for &key in &blob.cells {
                self.grid.insert(handle, key);
            }
        }
        self.players.insert(id, player);
    }

    /// Remove a player, scrubbing all of its blobs from the grid.
    pub fn remove_player(&mut self, id: &Uuid) -> Option<Player> {
        let player = self.players.remove(id)?;
        for (index, blob) in player.blobs.iter().enumerate() {
            let handle = EntityHandle::Blob {
                player: *id,
                index: index as u32,
            };
            for &key in &blob.cells {
                self.grid.remove(&handle, key);
            }
        }
        Some(player)
    }

    /// Remove one blob from a player, keeping grid handles consistent.
    ///
    /// Uses swap-removal: the last blob takes the removed blob's index, so
    /// its grid handles are rewritten. Does not touch player aggregates.
    pub fn remove_blob(&mut self, player_id: &Uuid, index: usize) {
        let Self { players, grid, .. } = self;
        let Some(player) = players.get_mut(player_id) else {
            return;
        };
        if index >= player.blobs.len() {
            return;
        }

        let handle = EntityHandle::Blob {
            player: *player_id,
            index: index as u32,
        };
        let blob = player.blobs.swap_remove(index);
        for &key in &blob.cells {
            grid.remove(&handle, key);
        }

        // The swapped-in blob kept its cells but changed index.
        if index < player.blobs.len() {
            let old_handle = EntityHandle::Blob {
                player: *player_id,
                index: player.blobs.len() as u32,
            };
            for &key in &player.blobs[index].cells {
                grid.remove(&old_handle, key);
                grid.insert(handle, key);
            }
        }
    }

    /// Insert a food pellet at a found placement.
    pub fn add_food(&mut self, placement: Placement, radius: f64) -> Uuid {
        self.add_object(ObjectKind::Food, placement, radius)
    }

    /// Insert a virus at a found placement.
    pub fn add_virus(&mut self, placement: Placement, radius: f64) -> Uuid {
        self.add_object(ObjectKind::Virus, placement, radius)
    }

    fn add_object(&mut self, kind: ObjectKind, placement: Placement, radius: f64) -> Uuid {
        let object = WorldObject::new(kind, placement.pos, radius, placement.aabb, placement.cells);
        let id = object.id;
        let handle = EntityHandle::Object { id };
        for &key in &object.cells {
            self.grid.insert(handle, key);
        }
        self.objects.insert(id, object);
        id
    }

    /// Remove a world object, scrubbing its cells.
    pub fn remove_object(&mut self, id: &Uuid) -> Option<WorldObject> {
        let object = self.objects.remove(id)?;
        let handle = EntityHandle::Object { id: *id };
        for &key in &object.cells {
            self.grid.remove(&handle, key);
        }
        Some(object)
    }

    /// Dereference a handle to its entity AABB. Stale handles are a lookup
    /// miss.
    pub fn entity_aabb(&self, handle: &EntityHandle) -> Option<Aabb> {
        let aabb = match handle {
            EntityHandle::Blob { player, index } => self
                .players
                .get(player)
                .and_then(|p| p.blobs.get(*index as usize))
                .map(|blob| blob.aabb),
            EntityHandle::Object { id } => self.objects.get(id).map(|object| object.aabb),
        };
        if aabb.is_none() {
            warn!("stale handle {} in grid lookup", handle.wire_id());
        }
        aabb
    }

    /// Reconcile every blob's cell set with its current AABB.
    ///
    /// Runs after motion integration; diffs the old and new cell sets so
    /// stationary blobs cost two set comparisons and no grid mutation.
    pub fn update_blob_membership(&mut self) {
        let Self { players, grid, .. } = self;
        for (id, player) in players.iter_mut() {
            for (index, blob) in player.blobs.iter_mut().enumerate() {
                let new_cells = grid.cells_intersecting(&blob.aabb);
                if new_cells == blob.cells {
                    continue;
                }
                let handle = EntityHandle::Blob {
                    player: *id,
                    index: index as u32,
                };
                for &key in &blob.cells {
                    if !new_cells.contains(&key) {
                        grid.remove(&handle, key);
                    }
                }
                for &key in &new_cells {
                    if !blob.cells.contains(&key) {
                        grid.insert(handle, key);
                    }
                }
                blob.cells = new_cells;
            }
        }
    }
}
