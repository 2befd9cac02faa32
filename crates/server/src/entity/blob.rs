//! Player blob.

use std::collections::HashSet;

use glam::DVec2;

use crate::bounds::Aabb;
use crate::spatial::CellKey;

/// A single circular cell controlled by a player.
#[derive(Debug, Clone)]
pub struct Blob {
    /// Position in world coordinates.
    pub pos: DVec2,
    pub radius: f64,
    /// Displacement per second from the last integration step.
    pub vel: DVec2,
    /// Swept box of the last integration step.
    pub aabb: Aabb,
    /// Grid cells this blob is currently indexed in.
    pub cells: HashSet<CellKey>,
}

impl Blob {
    pub fn new(pos: DVec2, radius: f64) -> Self {
        Self {
            pos,
            radius,
            vel: DVec2::ZERO,
            aabb: Aabb::from_center(pos.x, pos.y, radius, radius),
            cells: HashSet::new(),
        }
    }

    /// Refresh the swept AABB from the current position and velocity.
    #[inline]
    pub fn refresh_aabb(&mut self, tps: f64) {
        self.aabb = Aabb::swept(
            self.pos.x,
            self.pos.y,
            self.vel.x,
            self.vel.y,
            self.radius,
            self.radius,
            tps,
        );
    }

    /// Area-conserving growth from consuming another circle.
    #[inline]
    pub fn absorb(&mut self, other_radius: f64) {
        self.radius = (self.radius * self.radius + other_radius * other_radius).sqrt();
    }
}
