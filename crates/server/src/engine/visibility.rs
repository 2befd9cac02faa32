//! Per-player visibility extraction.
//!
//! Sweeps the grid cells under a player's vision box and collects every
//! entity whose AABB actually overlaps it. Read-only on the world.

use std::collections::HashSet;

use protocol::{BlobView, ObjectTag, WorldObjectView};
use tracing::warn;
use uuid::Uuid;

use crate::entity::{EntityHandle, ObjectKind, Player};
use crate::world::World;

/// What one player can see this tick.
#[derive(Debug, Default)]
pub struct PlayerView {
    pub other_blobs: Vec<(EntityHandle, BlobView)>,
    pub world_objects: Vec<(EntityHandle, WorldObjectView)>,
    /// Every non-self player whose blob was touched during the sweep, even
    /// if the overlap filter later excluded it. Lets clients evict stale
    /// caches.
    pub seen_players: HashSet<Uuid>,
}

/// Gather the view for one player.
pub fn gather_view(world: &World, player: &Player) -> PlayerView {
    let mut view = PlayerView::default();
    // A blob can sit in several swept cells; visit each handle once.
    let mut visited: HashSet<EntityHandle> = HashSet::new();

    for key in world.grid.cells_intersecting(&player.vision) {
        for &handle in world.grid.iter_cell(key) {
            if !visited.insert(handle) {
                continue;
            }
            match handle {
                EntityHandle::Blob {
                    player: owner,
                    index,
                } => {
                    if owner == player.id {
                        continue;
                    }
                    view.seen_players.insert(owner);
                    let Some(blob) = world
                        .players
                        .get(&owner)
                        .and_then(|p| p.blobs.get(index as usize))
                    else {
                        warn!("stale blob handle {} in visibility sweep", handle.wire_id());
                        continue;
                    };
                    if blob.aabb.overlaps(&player.vision) {
                        view.other_blobs.push((
                            handle,
                            BlobView {
                                x: blob.pos.x,
                                y: blob.pos.y,
                                r: blob.radius,
                                vx: blob.vel.x,
                                vy: blob.vel.y,
                            },
                        ));
                    }
                }
                EntityHandle::Object { id } => {
                    let Some(object) = world.objects.get(&id) else {
                        warn!("stale object handle {id} in visibility sweep");
                        continue;
                    };
                    if object.aabb.overlaps(&player.vision) {
                        view.world_objects.push((
                            handle,
                            WorldObjectView {
                                kind: match object.kind {
                                    ObjectKind::Food => ObjectTag::Food,
                                    ObjectKind::Virus => ObjectTag::Virus,
                                },
                                x: object.pos.x,
                                y: object.pos.y,
                                r: object.radius,
                            },
                        ));
                    }
                }
            }
        }
    }
    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::Aabb;
    use crate::placement::Placement;
    use glam::DVec2;

    fn seed_player(world: &mut World, pos: DVec2, radius: f64) -> Uuid {
        let id = Uuid::new_v4();
        let mut player = Player::new(id, "viewer".to_string(), pos, radius, 1920.0, 1080.0);
        player.blobs[0].cells = world.grid.cells_intersecting(&player.blobs[0].aabb);
        world.insert_player(player);
        id
    }

    fn seed_food(world: &mut World, pos: DVec2, radius: f64) -> Uuid {
        let aabb = Aabb::from_center(pos.x, pos.y, radius, radius);
        let cells = world.grid.cells_intersecting(&aabb);
        world.add_food(Placement { pos, aabb, cells }, radius)
    }

    #[test]
    fn test_distant_player_is_invisible() {
        let mut world = World::new(2000.0, 100.0);
        let p1 = seed_player(&mut world, DVec2::ZERO, 20.0);
        seed_player(&mut world, DVec2::new(1000.0, 0.0), 20.0);

        // Vision half-width at r=20 is ~58 px, far short of 1000.
        let view = gather_view(&world, &world.players[&p1]);
        assert!(view.other_blobs.is_empty());
        assert!(view.seen_players.is_empty());
    }

    #[test]
    fn test_nearby_player_is_visible_with_kinematics() {
        let mut world = World::new(2000.0, 100.0);
        let p1 = seed_player(&mut world, DVec2::ZERO, 20.0);
        let p2 = seed_player(&mut world, DVec2::new(50.0, 0.0), 20.0);

        let view = gather_view(&world, &world.players[&p1]);
        assert_eq!(view.other_blobs.len(), 1);
        let (handle, blob) = &view.other_blobs[0];
        assert_eq!(*handle, EntityHandle::Blob { player: p2, index: 0 });
        assert_eq!((blob.x, blob.y, blob.r), (50.0, 0.0, 20.0));
        assert_eq!((blob.vx, blob.vy), (0.0, 0.0));
        assert!(view.seen_players.contains(&p2));
    }

    #[test]
    fn test_own_blobs_are_excluded() {
        let mut world = World::new(2000.0, 100.0);
        let p1 = seed_player(&mut world, DVec2::ZERO, 20.0);

        let view = gather_view(&world, &world.players[&p1]);
        assert!(view.other_blobs.is_empty());
        assert!(view.seen_players.is_empty());
    }

    #[test]
    fn test_objects_spanning_cells_appear_once() {
        let mut world = World::new(2000.0, 100.0);
        let p1 = seed_player(&mut world, DVec2::ZERO, 200.0);
        // Straddles the cell corner at the origin: indexed in four cells.
        let food = seed_food(&mut world, DVec2::new(0.0, 0.0), 30.0);
        assert!(world.objects[&food].cells.len() >= 4);

        let view = gather_view(&world, &world.players[&p1]);
        let matches = view
            .world_objects
            .iter()
            .filter(|(handle, _)| *handle == EntityHandle::Object { id: food })
            .count();
        assert_eq!(matches, 1);
    }

    #[test]
    fn test_touched_but_filtered_player_still_in_metadata() {
        let mut world = World::new(2000.0, 100.0);
        let p1 = seed_player(&mut world, DVec2::ZERO, 20.0);
        // Same grid cell as p1's vision box, but outside the box itself
        // (vision half-extends ~58x32 px; the cell is 100 px wide).
        let p2 = seed_player(&mut world, DVec2::new(95.0, 95.0), 2.0);
        let vision = world.players[&p1].vision;
        assert!(!world.players[&p2].blobs[0].aabb.overlaps(&vision));

        let view = gather_view(&world, &world.players[&p1]);
        assert!(view.other_blobs.is_empty());
        assert!(view.seen_players.contains(&p2));
    }
}
