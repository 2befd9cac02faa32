//! Motion integration toward per-player targets.

use glam::DVec2;

use crate::world::World;

/// Advance every blob toward its owner's target and refresh derived player
/// state.
///
/// A blob steps at most its own radius per nominal tick, easing in once the
/// target is closer than one radius. Positions clamp to the world so a blob
/// never pokes past the border. `dt` is elapsed wall time in seconds,
/// already clamped by the scheduler.
pub fn integrate(world: &mut World, dt: f64, tps: f64, view_width: f64, view_height: f64) {
    let world_radius = world.radius;
    for player in world.players.values_mut() {
        let target = player.target;
        for blob in &mut player.blobs {
            let delta = target - blob.pos;
            let dist_sq = delta.length_squared();
            if dist_sq == 0.0 {
                blob.vel = DVec2::ZERO;
                blob.refresh_aabb(tps);
                continue;
            }

            let step = if dist_sq > blob.radius * blob.radius {
                delta * (blob.radius / dist_sq.sqrt())
            } else {
                delta
            };

            let limit = world_radius - blob.radius;
            blob.pos.x = (blob.pos.x + step.x * dt * tps).clamp(-limit, limit);
            blob.pos.y = (blob.pos.y + step.y * dt * tps).clamp(-limit, limit);
            blob.vel = step * tps;
            blob.refresh_aabb(tps);
        }
        player.update_aggregates(view_width, view_height);
    }
}
