//! Collision resolution: consumption of food and smaller blobs.
//!
//! Runs after reindexing, so every blob's cell set is current and doubles
//! as its neighborhood query. Events are collected first and applied in a
//! second pass; prey radii are captured at scan time.
//!
//! Viruses take part in placement conflicts but have no tick behavior here.

use std::collections::{HashMap, HashSet};

use tracing::info;
use uuid::Uuid;

use crate::entity::{EntityHandle, ObjectKind};
use crate::world::World;

/// Size advantage required to consume another player's blob.
const EAT_SIZE_RATIO: f64 = 1.15;

/// What happened during one resolution pass.
#[derive(Debug, Default)]
pub struct CollisionOutcome {
    pub food_consumed: usize,
    pub blobs_consumed: usize,
    /// Players whose last blob was consumed this tick.
    pub removed_players: Vec<Uuid>,
}

#[derive(Debug, Clone, Copy)]
enum Prey {
    Food { id: Uuid, radius: f64 },
    Blob { player: Uuid, index: u32, radius: f64 },
}

#[derive(Debug, Clone, Copy)]
struct EatEvent {
    eater: (Uuid, u32),
    prey: Prey,
}

/// Resolve consumption for the whole world.
pub fn resolve(world: &mut World, tps: f64, view_width: f64, view_height: f64) -> CollisionOutcome {
    let events = scan(world);
    if events.is_empty() {
        return CollisionOutcome::default();
    }
    apply(world, events, tps, view_width, view_height)
}

/// Collect consumption events without mutating anything.
fn scan(world: &World) -> Vec<EatEvent> {
    let mut events = Vec::new();
    for (&player_id, player) in &world.players {
        for (index, blob) in player.blobs.iter().enumerate() {
            let eater = (player_id, index as u32);
            let mut checked: HashSet<EntityHandle> = HashSet::new();
            for &key in &blob.cells {
                for &handle in world.grid.iter_cell(key) {
                    if !checked.insert(handle) {
                        continue;
                    }
                    match handle {
                        EntityHandle::Object { id } => {
                            let Some(object) = world.objects.get(&id) else {
                                continue;
                            };
                            if object.kind != ObjectKind::Food {
                                continue;
                            }
                            // Food is eaten once its center is covered.
                            if blob.pos.distance_squared(object.pos)
                                < blob.radius * blob.radius
                            {
                                events.push(EatEvent {
                                    eater,
                                    prey: Prey::Food {
                                        id,
                                        radius: object.radius,
                                    },
                                });
                            }
                        }
                        EntityHandle::Blob {
                            player: other,
                            index: other_index,
                        } => {
                            if other == player_id {
                                continue;
                            }
                            let Some(victim) = world
                                .players
                                .get(&other)
                                .and_then(|p| p.blobs.get(other_index as usize))
                            else {
                                continue;
                            };
                            if blob.radius < EAT_SIZE_RATIO * victim.radius {
                                continue;
                            }
                            let reach = blob.radius - victim.radius / 3.0;
                            if blob.pos.distance_squared(victim.pos) < reach * reach {
                                events.push(EatEvent {
                                    eater,
                                    prey: Prey::Blob {
                                        player: other,
                                        index: other_index,
                                        radius: victim.radius,
                                    },
                                });
                            }
                        }
                    }
                }
            }
        }
    }
    events
}

fn apply(
    world: &mut World,
    events: Vec<EatEvent>,
    tps: f64,
    view_width: f64,
    view_height: f64,
) -> CollisionOutcome {
    let mut outcome = CollisionOutcome::default();
    let mut eaten_food: HashSet<Uuid> = HashSet::new();
    let mut eaten_blobs: HashSet<(Uuid, u32)> = HashSet::new();
    // Extra squared radius each eater gains, keyed by its pre-removal index.
    let mut growth: HashMap<(Uuid, u32), f64> = HashMap::new();

    for event in events {
        match event.prey {
            Prey::Food { id, radius } => {
                if eaten_food.insert(id) {
                    *growth.entry(event.eater).or_insert(0.0) += radius * radius;
                }
            }
            Prey::Blob {
                player,
                index,
                radius,
            } => {
                if eaten_blobs.insert((player, index)) {
                    *growth.entry(event.eater).or_insert(0.0) += radius * radius;
                }
            }
        }
    }

    for id in &eaten_food {
        world.remove_object(id);
    }
    outcome.food_consumed = eaten_food.len();

    // Grow surviving eaters before blob removal shuffles indices.
    let mut touched_players: HashSet<Uuid> = HashSet::new();
    for (&(player_id, index), &gained_sq) in &growth {
        if eaten_blobs.contains(&(player_id, index)) {
            continue;
        }
        if let Some(blob) = world
            .players
            .get_mut(&player_id)
            .and_then(|p| p.blobs.get_mut(index as usize))
        {
            blob.absorb(gained_sq.sqrt());
            blob.refresh_aabb(tps);
            touched_players.insert(player_id);
        }
    }

    // Remove consumed blobs per player, highest index first so swap-removal
    // never relocates a still-pending victim.
    let mut victims: HashMap<Uuid, Vec<u32>> = HashMap::new();
    for &(player_id, index) in &eaten_blobs {
        victims.entry(player_id).or_default().push(index);
    }
    outcome.blobs_consumed = eaten_blobs.len();

    for (player_id, mut indices) in victims {
        indices.sort_unstable_by(|a, b| b.cmp(a));
        for index in indices {
            world.remove_blob(&player_id, index as usize);
        }
        let starved = world
            .players
            .get(&player_id)
            .is_some_and(|p| p.blobs.is_empty());
        if starved {
            world.remove_player(&player_id);
            info!("player {player_id} was consumed");
            outcome.removed_players.push(player_id);
            touched_players.remove(&player_id);
        } else {
            touched_players.insert(player_id);
        }
    }

    // Grown blobs moved their AABBs; reconcile grid membership and derived
    // player state.
    world.update_blob_membership();
    for player_id in touched_players {
        if let Some(player) = world.players.get_mut(&player_id) {
            player.update_aggregates(view_width, view_height);
        }
    }

    outcome
}
