//! Server configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub food: FoodConfig,
    #[serde(default)]
    pub virus: VirusConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Config {
    /// Load configuration from `config.toml` or use defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = Path::new("config.toml");
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&contents)?)
        } else {
            info!("No config.toml found, creating default config");
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            Ok(default_config)
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            player: PlayerConfig::default(),
            food: FoodConfig::default(),
            virus: VirusConfig::default(),
            client: ClientConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

/// World geometry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorldConfig {
    /// Half-extent of the square world, in pixels.
    #[serde(default = "default_world_radius")]
    pub radius: f64,
    /// Edge length of one spatial grid cell.
    #[serde(default = "default_grid_cell_size")]
    pub grid_cell_size: f64,
    /// Clearance required around newly placed entities.
    #[serde(default = "default_min_separation")]
    pub min_separation: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            radius: default_world_radius(),
            grid_cell_size: default_grid_cell_size(),
            min_separation: default_min_separation(),
        }
    }
}

fn default_world_radius() -> f64 {
    7000.0
}
fn default_grid_cell_size() -> f64 {
    100.0
}
fn default_min_separation() -> f64 {
    10.0
}

/// Player spawning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerConfig {
    /// Radius of a newly spawned blob.
    #[serde(default = "default_initial_radius")]
    pub initial_radius: f64,
    /// Placement attempts per player per tick.
    #[serde(default = "default_player_spawn_attempts")]
    pub max_spawn_attempts: u32,
    /// Seconds a join may wait for a collision-free spawn before the engine
    /// gives up on it.
    #[serde(default = "default_spawn_deadline_secs")]
    pub spawn_deadline_secs: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            initial_radius: default_initial_radius(),
            max_spawn_attempts: default_player_spawn_attempts(),
            spawn_deadline_secs: default_spawn_deadline_secs(),
        }
    }
}

fn default_initial_radius() -> f64 {
    20.0
}
fn default_player_spawn_attempts() -> u32 {
    32
}
fn default_spawn_deadline_secs() -> u64 {
    10
}

/// Food spawning and budget policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FoodConfig {
    #[serde(default = "default_min_food_radius")]
    pub min_radius: f64,
    #[serde(default = "default_max_food_radius")]
    pub max_radius: f64,
    /// Potential food mass credited per player spawn.
    #[serde(default = "default_budget_per_player")]
    pub budget_per_player: f64,
    /// Multiplier on the per-tick budget release. Zero disables food spawning.
    #[serde(default = "default_release_rate")]
    pub release_rate: f64,
    /// Placement attempts shared by all food spawned in one tick.
    #[serde(default = "default_food_spawn_attempts")]
    pub max_spawn_attempts: u32,
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self {
            min_radius: default_min_food_radius(),
            max_radius: default_max_food_radius(),
            budget_per_player: default_budget_per_player(),
            release_rate: default_release_rate(),
            max_spawn_attempts: default_food_spawn_attempts(),
        }
    }
}

fn default_min_food_radius() -> f64 {
    5.0
}
fn default_max_food_radius() -> f64 {
    10.0
}
fn default_budget_per_player() -> f64 {
    100.0
}
fn default_release_rate() -> f64 {
    1.0
}
fn default_food_spawn_attempts() -> u32 {
    128
}

/// Virus sizing. Virus creation is policy-driven and sits outside the tick
/// loop; these bounds size whatever placements that policy makes.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VirusConfig {
    #[serde(default = "default_virus_min_radius")]
    pub min_radius: f64,
    #[serde(default = "default_virus_max_radius")]
    pub max_radius: f64,
}

impl Default for VirusConfig {
    fn default() -> Self {
        Self {
            min_radius: default_virus_min_radius(),
            max_radius: default_virus_max_radius(),
        }
    }
}

fn default_virus_min_radius() -> f64 {
    100.0
}
fn default_virus_max_radius() -> f64 {
    141.4
}

/// Client viewport dimensions, used to derive vision boxes and to translate
/// cursor positions.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    #[serde(default = "default_client_width")]
    pub width_pixels: f64,
    #[serde(default = "default_client_height")]
    pub height_pixels: f64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            width_pixels: default_client_width(),
            height_pixels: default_client_height(),
        }
    }
}

fn default_client_width() -> f64 {
    1920.0
}
fn default_client_height() -> f64 {
    1080.0
}

/// Tick loop and queue sizing.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Simulation ticks per second.
    #[serde(default = "default_tps")]
    pub tps: u32,
    /// Capacity of the inbound message queue.
    #[serde(default = "default_input_queue_capacity")]
    pub input_queue_capacity: usize,
    /// Capacity of the outbound broadcast channel. Lagging subscribers lose
    /// the oldest messages.
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tps: default_tps(),
            input_queue_capacity: default_input_queue_capacity(),
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

fn default_tps() -> u32 {
    60
}
fn default_input_queue_capacity() -> usize {
    1024
}
fn default_broadcast_capacity() -> usize {
    8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.engine.tps, 60);
        assert_eq!(config.world.grid_cell_size, 100.0);
        assert_eq!(config.player.initial_radius, 20.0);
        assert!(config.food.min_radius <= config.food.max_radius);
        assert!(config.virus.min_radius <= config.virus.max_radius);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [world]
            radius = 300.0

            [engine]
            tps = 30
            "#,
        )
        .unwrap();
        assert_eq!(config.world.radius, 300.0);
        assert_eq!(config.engine.tps, 30);
        assert_eq!(config.world.grid_cell_size, 100.0);
        assert_eq!(config.client.width_pixels, 1920.0);
    }
}
