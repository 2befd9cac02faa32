//! Tick engine: fixed-rate pipeline over the world state.
//!
//! The engine owns the world, the food budget and both bus endpoints. Each
//! tick runs the fixed pipeline: drain inputs, spawn food, spawn pending
//! players, integrate motion, reindex blobs, resolve collisions, gather
//! visibility and broadcast. Everything happens on one task; transports
//! only ever touch the queues.

mod collision;
mod ingest;
mod motion;
mod visibility;

pub use collision::CollisionOutcome;
pub use ingest::IngestQueue;
pub use visibility::{gather_view, PlayerView};

use std::time::Duration;

use glam::DVec2;
use protocol::{
    player_topic, ClientMessage, Envelope, InboundEnvelope, SelfBlob, ServerMessage, SpawnPoint,
    TickData,
};
use rand::Rng;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::entity::Player;
use crate::placement::{self, SpawnKind};
use crate::world::World;

/// Upper bound on per-tick wall time, in seconds. A stalled scheduler
/// carries at most this much motion into one tick.
const MAX_DT: f64 = 0.01;

/// A join waiting for a collision-free spawn.
#[derive(Debug)]
struct PendingSpawn {
    uuid: Uuid,
    username: String,
    ticks_waited: u64,
}

/// Endpoints the session gateway uses to reach the engine.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    inbound: mpsc::Sender<InboundEnvelope>,
    outbound: broadcast::Sender<Envelope>,
}

impl EngineHandle {
    /// Queue endpoint for inbound `player:*` messages.
    pub fn sender(&self) -> mpsc::Sender<InboundEnvelope> {
        self.inbound.clone()
    }

    /// Subscribe to outbound per-player envelopes. Receivers that lag lose
    /// the oldest messages first.
    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.outbound.subscribe()
    }
}

/// The authoritative tick engine.
pub struct Engine {
    config: Config,
    world: World,
    ingest: IngestQueue,
    outbound: broadcast::Sender<Envelope>,
    pending_spawns: Vec<PendingSpawn>,
    /// Potential food mass awaiting conversion into pellets.
    food_amount: f64,
    tick_count: u64,
    /// Exponential moving average of tick duration, in milliseconds.
    pub update_time_avg: f64,
    last_slow_warn_tick: u64,
}

impl Engine {
    pub fn new(config: Config) -> (Self, EngineHandle) {
        let (inbound_tx, ingest) = IngestQueue::new(config.engine.input_queue_capacity);
        let (outbound, _) = broadcast::channel(config.engine.broadcast_capacity);
        let world = World::new(config.world.radius, config.world.grid_cell_size);

        let handle = EngineHandle {
            inbound: inbound_tx,
            outbound: outbound.clone(),
        };
        let engine = Self {
            config,
            world,
            ingest,
            outbound,
            pending_spawns: Vec::new(),
            food_amount: 0.0,
            tick_count: 0,
            update_time_avg: 0.0,
            last_slow_warn_tick: 0,
        };
        (engine, handle)
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn food_amount(&self) -> f64 {
        self.food_amount
    }

    /// Advance the world by one tick. `dt` is elapsed wall time in seconds,
    /// already clamped by the scheduler.
    pub fn tick(&mut self, dt: f64) {
        self.tick_count += 1;
        let tps = self.config.engine.tps as f64;
        let view_w = self.config.client.width_pixels;
        let view_h = self.config.client.height_pixels;

        self.drain_inputs();
        self.spawn_food();
        self.spawn_pending_players();
        motion::integrate(&mut self.world, dt, tps, view_w, view_h);
        self.world.update_blob_membership();
        let outcome = collision::resolve(&mut self.world, tps, view_w, view_h);
        if !outcome.removed_players.is_empty() {
            debug!(
                "tick #{}: {} players consumed",
                self.tick_count,
                outcome.removed_players.len()
            );
        }
        self.broadcast();
    }

    /// Apply every message queued since the previous tick, in arrival order.
    fn drain_inputs(&mut self) {
        for message in self.ingest.drain() {
            match message {
                ClientMessage::Join(join) => {
                    if self.world.players.contains_key(&join.uuid)
                        || self.pending_spawns.iter().any(|p| p.uuid == join.uuid)
                    {
                        warn!("duplicate join for {}", join.uuid);
                        continue;
                    }
                    self.pending_spawns.push(PendingSpawn {
                        uuid: join.uuid,
                        username: join.username,
                        ticks_waited: 0,
                    });
                }
                ClientMessage::UpdatePosition(update) => {
                    // Player may have left already; drop silently.
                    let Some(player) = self.world.players.get_mut(&update.uuid) else {
                        continue;
                    };
                    let zoom = player.zoom_factor;
                    let off_x = (update.x - self.config.client.width_pixels / 2.0) * zoom;
                    let off_y = (update.y - self.config.client.height_pixels / 2.0) * zoom;
                    // Screen y grows downward, world y grows upward.
                    player.target =
                        DVec2::new(player.com.x + off_x, player.com.y - off_y);
                }
            }
        }
    }

    /// Convert part of the food budget into pellets.
    ///
    /// The release curve (`amount - ln(amount + 1)` per tick, scaled by the
    /// configured rate) is policy, not physics. Only successful spawns
    /// consume budget; the attempt cap is shared by all candidates in one
    /// tick.
    fn spawn_food(&mut self) {
        let food = &self.config.food;
        let mut release = (food.release_rate
            * (self.food_amount - (self.food_amount + 1.0).ln()))
        .min(self.food_amount);
        if release < food.min_radius {
            return;
        }

        let mut attempts_left = food.max_spawn_attempts;
        let mut rng = rand::rng();
        while attempts_left > 0 && release >= food.min_radius {
            let radius = rng
                .random_range(food.min_radius..=food.max_radius)
                .min(release);
            attempts_left -= 1;
            if let Some(spot) = placement::find_spawn_point(
                &self.world,
                radius,
                SpawnKind::Food,
                self.config.world.min_separation,
                1,
            ) {
                self.world.add_food(spot, radius);
                release -= radius;
                self.food_amount -= radius;
            }
        }
        if attempts_left == 0 && release >= food.min_radius {
            error!(
                "food placement exhausted after {} attempts ({release:.1} mass unspent)",
                food.max_spawn_attempts
            );
        }
    }

    /// Try to place every queued join; emit `join_game` for successes.
    fn spawn_pending_players(&mut self) {
        if self.pending_spawns.is_empty() {
            return;
        }
        let radius = self.config.player.initial_radius;
        let deadline_ticks =
            self.config.player.spawn_deadline_secs * self.config.engine.tps as u64;

        let mut still_pending = Vec::new();
        for mut pending in std::mem::take(&mut self.pending_spawns) {
            let spot = placement::find_spawn_point(
                &self.world,
                radius,
                SpawnKind::PlayerBlob,
                self.config.world.min_separation,
                self.config.player.max_spawn_attempts,
            );
            match spot {
                Some(spot) => {
                    let spawn = spot.pos;
                    let mut player = Player::new(
                        pending.uuid,
                        pending.username,
                        spawn,
                        radius,
                        self.config.client.width_pixels,
                        self.config.client.height_pixels,
                    );
                    player.blobs[0].cells = spot.cells;
                    self.world.insert_player(player);
                    self.food_amount += self.config.food.budget_per_player;
                    info!(
                        "player {} spawned at ({:.1}, {:.1})",
                        pending.uuid, spawn.x, spawn.y
                    );

                    let player = &self.world.players[&pending.uuid];
                    let view = visibility::gather_view(&self.world, player);
                    let data = self.tick_data(player, view, Some(spawn));
                    self.publish(&pending.uuid, ServerMessage::JoinGame(data));
                }
                None => {
                    pending.ticks_waited += 1;
                    error!(
                        "player spawn placement exhausted (radius {radius}) for {}, \
                         waited {} ticks",
                        pending.uuid, pending.ticks_waited
                    );
                    if pending.ticks_waited >= deadline_ticks {
                        error!("dropping join for {} after spawn deadline", pending.uuid);
                    } else {
                        still_pending.push(pending);
                    }
                }
            }
        }
        self.pending_spawns = still_pending;
    }

    /// Publish one `tick_update` per player.
    fn broadcast(&self) {
        for (id, player) in &self.world.players {
            let view = visibility::gather_view(&self.world, player);
            let data = self.tick_data(player, view, None);
            self.publish(id, ServerMessage::TickUpdate(data));
        }
    }

    fn tick_data(
        &self,
        player: &Player,
        view: PlayerView,
        spawn: Option<DVec2>,
    ) -> TickData {
        TickData {
            com_x: player.com.x,
            com_y: player.com.y,
            self_blobs: player
                .blobs
                .iter()
                .map(|blob| SelfBlob {
                    x: blob.pos.x,
                    y: blob.pos.y,
                    r: blob.radius,
                })
                .collect(),
            zoom_factor: player.zoom_factor,
            other_blobs: view
                .other_blobs
                .into_iter()
                .map(|(handle, blob)| (handle.wire_id(), blob))
                .collect(),
            world_objects: view
                .world_objects
                .into_iter()
                .map(|(handle, object)| (handle.wire_id(), object))
                .collect(),
            player_metadata: view.seen_players.into_iter().collect(),
            world_radius: self.config.world.radius,
            spawn: spawn.map(|pos| SpawnPoint { x: pos.x, y: pos.y }),
        }
    }

    fn publish(&self, player: &Uuid, message: ServerMessage) {
        // Best effort: no subscribers (or only lagged ones) is fine.
        let _ = self.outbound.send(Envelope {
            topic: player_topic(player),
            message,
        });
    }
}

/// Drive the engine at its fixed tick rate. Runs until the task is dropped.
pub async fn run_engine_loop(mut engine: Engine) {
    let tps = engine.config.engine.tps;
    let tick_interval = Duration::from_secs_f64(1.0 / tps as f64);
    let start = Instant::now() + tick_interval;
    let mut ticker = interval_at(start, tick_interval);
    // Fire late ticks immediately instead of bunching them up; the clamped
    // dt absorbs the lost time.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("tick engine running at {tps} tps");
    let mut prev_tick = Instant::now();
    loop {
        ticker.tick().await;
        let tick_start = Instant::now();
        let dt = (tick_start - prev_tick).as_secs_f64().min(MAX_DT);
        prev_tick = tick_start;

        engine.tick(dt);

        let tick_ms = tick_start.elapsed().as_secs_f64() * 1000.0;
        engine.update_time_avg = engine.update_time_avg * 0.5 + tick_ms * 0.5;

        let budget_ms = tick_interval.as_secs_f64() * 1000.0 * 0.9;
        if tick_ms > budget_ms && engine.tick_count - engine.last_slow_warn_tick >= tps as u64 {
            engine.last_slow_warn_tick = engine.tick_count;
            warn!(
                "slow tick #{}: {:.3}ms (budget {:.1}ms) - {} players, {} objects",
                engine.tick_count,
                tick_ms,
                budget_ms,
                engine.world.players.len(),
                engine.world.objects.len()
            );
        }

        if engine.tick_count % 400 == 0 {
            debug!(
                "tick #{}: avg {:.2}ms | {} players, {} objects, {} grid cells",
                engine.tick_count,
                engine.update_time_avg,
                engine.world.players.len(),
                engine.world.objects.len(),
                engine.world.grid.len()
            );
        }
    }
}
