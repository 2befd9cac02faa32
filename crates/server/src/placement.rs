//! Collision-free placement search.
//!
//! Random-sampling search for a spawn point whose padded box overlaps no
//! existing entity. The caller inserts the entity afterward.

use std::collections::HashSet;

use glam::DVec2;
use rand::Rng;

use crate::bounds::Aabb;
use crate::entity::{EntityHandle, ObjectKind};
use crate::spatial::{cell_coords_of_key, CellKey};
use crate::world::World;

/// What is being placed. A spawning player blob may overlap food; food may
/// overlap nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnKind {
    PlayerBlob,
    Food,
}

/// A collision-free spot for a new entity.
///
/// `aabb` and `cells` describe the entity's own box, not the padded box used
/// for the conflict query, so inserting with them keeps grid membership
/// consistent with geometry.
#[derive(Debug, Clone)]
pub struct Placement {
    pub pos: DVec2,
    pub aabb: Aabb,
    pub cells: HashSet<CellKey>,
}

/// Axis-aligned sampling window for retargeted attempts.
#[derive(Debug, Clone, Copy)]
struct Window {
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
}

/// Search for a point where a circle of `radius` fits with
/// `min_separation` clearance, trying at most `max_attempts` samples.
///
/// When a failed probe finds exactly one unoccupied grid cell, later
/// attempts sample inside that cell's interior to improve the hit rate; the
/// success criterion is unchanged.
pub fn find_spawn_point(
    world: &World,
    radius: f64,
    kind: SpawnKind,
    min_separation: f64,
    max_attempts: u32,
) -> Option<Placement> {
    let extent = world.radius - radius;
    if extent <= 0.0 {
        return None;
    }

    let mut rng = rand::rng();
    let mut window: Option<Window> = None;

    for _ in 0..max_attempts {
        let (x, y) = match window {
            Some(w) => (
                rng.random_range(w.min_x..=w.max_x),
                rng.random_range(w.min_y..=w.max_y),
            ),
            None => (
                rng.random_range(-extent..=extent),
                rng.random_range(-extent..=extent),
            ),
        };

        let pad = radius + min_separation;
        let padded = Aabb::from_center(x, y, pad, pad);
        let query_cells = world.grid.cells_intersecting(&padded);

        let mut conflict = false;
        let mut absent_cells = 0usize;
        let mut absent_key: CellKey = 0;
        let mut checked: HashSet<EntityHandle> = HashSet::new();

        'cells: for &key in &query_cells {
            if !world.grid.contains_cell(key) {
                absent_cells += 1;
                absent_key = key;
                continue;
            }
            for &handle in world.grid.iter_cell(key) {
                if !checked.insert(handle) {
                    continue;
                }
                // Spawning players tolerate food underneath them.
                if kind == SpawnKind::PlayerBlob {
                    if let EntityHandle::Object { id } = handle {
                        if world
                            .objects
                            .get(&id)
                            .is_some_and(|object| object.kind == ObjectKind::Food)
                        {
                            continue;
                        }
                    }
                }
                let Some(aabb) = world.entity_aabb(&handle) else {
                    continue;
                };
                if aabb.overlaps(&padded) {
                    conflict = true;
                    break 'cells;
                }
            }
        }

        if !conflict {
            let aabb = Aabb::from_center(x, y, radius, radius);
            let cells = world.grid.cells_intersecting(&aabb);
            return Some(Placement {
                pos: DVec2::new(x, y),
                aabb,
                cells,
            });
        }

        if window.is_none() && absent_cells == 1 {
            window = cell_interior(world, absent_key, min_separation, extent);
        }
    }

    None
}

/// Sampling window inside one grid cell, inset by the separation distance
/// and clamped to the world.
fn cell_interior(world: &World, key: CellKey, min_separation: f64, extent: f64) -> Option<Window> {
    let cell = world.grid.cell_size();
    let (cx, cy) = cell_coords_of_key(key);
    let min_x = (cx as f64 * cell + min_separation).max(-extent);
    let max_x = ((cx + 1) as f64 * cell - min_separation).min(extent);
    let min_y = (cy as f64 * cell + min_separation).max(-extent);
    let max_y = ((cy + 1) as f64 * cell - min_separation).min(extent);
    (min_x < max_x && min_y < max_y).then_some(Window {
        min_x,
        max_x,
        min_y,
        max_y,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_object(world: &mut World, kind: ObjectKind, x: f64, y: f64, radius: f64) {
        let aabb = Aabb::from_center(x, y, radius, radius);
        let cells = world.grid.cells_intersecting(&aabb);
        let placement = Placement {
            pos: DVec2::new(x, y),
            aabb,
            cells,
        };
        match kind {
            ObjectKind::Food => world.add_food(placement, radius),
            ObjectKind::Virus => world.add_virus(placement, radius),
        };
    }

    #[test]
    fn test_empty_world_placement_succeeds() {
        let world = World::new(300.0, 100.0);
        let placement = find_spawn_point(&world, 20.0, SpawnKind::Food, 10.0, 16).unwrap();

        assert!(placement.pos.x.abs() <= 280.0);
        assert!(placement.pos.y.abs() <= 280.0);
        assert_eq!(placement.aabb, Aabb::from_center(placement.pos.x, placement.pos.y, 20.0, 20.0));
        assert_eq!(placement.cells, world.grid.cells_intersecting(&placement.aabb));
        assert!(!placement.cells.is_empty());
    }

    #[test]
    fn test_radius_larger_than_world_fails() {
        let world = World::new(100.0, 100.0);
        assert!(find_spawn_point(&world, 150.0, SpawnKind::Food, 10.0, 16).is_none());
    }

    #[test]
    fn test_food_blankets_block_food_but_not_players() {
        let mut world = World::new(200.0, 100.0);
        // Tile the whole world with food so no clear gap remains anywhere.
        let mut y = -180.0;
        while y <= 180.0 {
            let mut x = -180.0;
            while x <= 180.0 {
                seed_object(&mut world, ObjectKind::Food, x, y, 30.0);
                x += 50.0;
            }
            y += 50.0;
        }

        // Food placement cannot find room.
        assert!(find_spawn_point(&world, 20.0, SpawnKind::Food, 10.0, 64).is_none());
        // A player blob ignores food during the check.
        assert!(find_spawn_point(&world, 20.0, SpawnKind::PlayerBlob, 10.0, 64).is_some());
    }

    #[test]
    fn test_viruses_block_player_spawns() {
        let mut world = World::new(200.0, 100.0);
        let mut y = -180.0;
        while y <= 180.0 {
            let mut x = -180.0;
            while x <= 180.0 {
                seed_object(&mut world, ObjectKind::Virus, x, y, 40.0);
                x += 50.0;
            }
            y += 50.0;
        }

        assert!(find_spawn_point(&world, 20.0, SpawnKind::PlayerBlob, 10.0, 64).is_none());
    }

    #[test]
    fn test_placement_clears_existing_entities() {
        let mut world = World::new(300.0, 100.0);
        for _ in 0..50 {
            if let Some(placement) = find_spawn_point(&world, 10.0, SpawnKind::Food, 5.0, 32) {
                world.add_food(placement, 10.0);
            }
        }
        assert!(!world.objects.is_empty());

        if let Some(placement) = find_spawn_point(&world, 15.0, SpawnKind::Food, 5.0, 64) {
            let new_aabb = placement.aabb;
            for object in world.objects.values() {
                assert!(
                    !object.aabb.overlaps(&new_aabb),
                    "spawn overlaps an existing object"
                );
            }
        }
    }
}
