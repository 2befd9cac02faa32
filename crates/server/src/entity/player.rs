//! Player state and derived view parameters.

use glam::DVec2;
use uuid::Uuid;

use super::Blob;
use crate::bounds::Aabb;

/// A player and the blobs it controls.
///
/// Exists from successful spawn until removal; always owns at least one
/// blob.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: Uuid,
    pub username: String,
    pub blobs: Vec<Blob>,
    /// Pull target in world coordinates, updated from client input.
    pub target: DVec2,
    /// Center of mass, weighted by blob area.
    pub com: DVec2,
    pub zoom_factor: f64,
    /// World-space rectangle this player can currently see.
    pub vision: Aabb,
}

impl Player {
    /// Create a freshly spawned player with a single blob. The target starts
    /// at the spawn point so the player idles until input arrives.
    pub fn new(
        id: Uuid,
        username: String,
        spawn: DVec2,
        radius: f64,
        view_width: f64,
        view_height: f64,
    ) -> Self {
        let mut player = Self {
            id,
            username,
            blobs: vec![Blob::new(spawn, radius)],
            target: spawn,
            com: spawn,
            zoom_factor: 0.0,
            vision: Aabb::default(),
        };
        player.update_aggregates(view_width, view_height);
        player
    }

    /// Recompute the center of mass, zoom factor and vision box.
    ///
    /// `com = Σ(r²·pos) / Σ(r²)`, `zoom = ln(Σr)/100 + 0.03`.
    pub fn update_aggregates(&mut self, view_width: f64, view_height: f64) {
        let mut total_radius = 0.0;
        let mut total_mass = 0.0;
        let mut weighted = DVec2::ZERO;
        for blob in &self.blobs {
            let mass = blob.radius * blob.radius;
            total_radius += blob.radius;
            total_mass += mass;
            weighted += blob.pos * mass;
        }
        debug_assert!(total_mass > 0.0, "player {} has no blob mass", self.id);

        self.com = weighted / total_mass;
        self.zoom_factor = total_radius.ln() / 100.0 + 0.03;
        self.vision = Aabb::from_center(
            self.com.x,
            self.com.y,
            view_width / 2.0 * self.zoom_factor,
            view_height / 2.0 * self.zoom_factor,
        );
    }

    /// Combined radius of all blobs.
    pub fn total_radius(&self) -> f64 {
        self.blobs.iter().map(|blob| blob.radius).sum()
    }
}
