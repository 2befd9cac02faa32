//! World objects: food pellets and viruses.

use std::collections::HashSet;

use glam::DVec2;
use uuid::Uuid;

use crate::bounds::Aabb;
use crate::spatial::CellKey;

/// World object variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// Inert, consumable pellet.
    Food,
    /// Obstacle. Blocks placement; tick-driven behavior is intentionally
    /// absent for now.
    Virus,
}

/// A free-standing circular object. World objects do not move: their AABB
/// and cell set are fixed at placement and cleared at removal.
#[derive(Debug, Clone)]
pub struct WorldObject {
    pub id: Uuid,
    pub kind: ObjectKind,
    pub pos: DVec2,
    pub radius: f64,
    pub aabb: Aabb,
    pub cells: HashSet<CellKey>,
}

impl WorldObject {
    pub fn new(
        kind: ObjectKind,
        pos: DVec2,
        radius: f64,
        aabb: Aabb,
        cells: HashSet<CellKey>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            pos,
            radius,
            aabb,
            cells,
        }
    }
}
