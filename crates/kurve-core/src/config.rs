use serde::{Deserialize, Serialize};

/// Data-driven tuning for the arena and its curves.
///
/// Server and client must agree on `arena_width`/`arena_height`; the server
/// sends both in every join response so the client never hardcodes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Arena width in world units.
    pub arena_width: f32,
    /// Arena height in world units.
    pub arena_height: f32,
    /// Curve forward speed (units/s).
    pub curve_speed: f32,
    /// Curve turn rate (degrees/s).
    pub steer_rate: f32,
    /// Trail thickness. Also the collision grid cell size.
    pub thickness: f32,
    /// Ticks of drawing between two gaps.
    pub gap_interval: u32,
    /// Ticks a gap stays open.
    pub gap_duration: u32,
    /// Simulation ticks per second.
    pub tick_rate_hz: f32,
    /// Snapshot broadcasts per second.
    pub snapshot_rate_hz: f32,
    /// Score limit is this value times (players - 1).
    pub score_limit_per_opponent: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            arena_width: 770.0,
            arena_height: 480.0,
            curve_speed: 88.0,
            steer_rate: 245.0,
            thickness: 3.0,
            gap_interval: 180,
            gap_duration: 12,
            tick_rate_hz: 60.0,
            snapshot_rate_hz: 20.0,
            score_limit_per_opponent: 10,
        }
    }
}

impl GameConfig {
    /// Fixed simulation timestep in seconds.
    pub fn tick_dt(&self) -> f32 {
        1.0 / self.tick_rate_hz
    }

    /// Check that every value is usable. Returns a description of the first
    /// problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.arena_width <= 0.0 || self.arena_height <= 0.0 {
            return Err("game.arena_width and game.arena_height must be > 0".to_string());
        }
        if self.thickness <= 0.0 {
            return Err("game.thickness must be > 0".to_string());
        }
        if self.thickness > self.arena_width.min(self.arena_height) {
            return Err("game.thickness must fit inside the arena".to_string());
        }
        if self.curve_speed <= 0.0 {
            return Err("game.curve_speed must be > 0".to_string());
        }
        if self.steer_rate < 0.0 {
            return Err("game.steer_rate must be >= 0".to_string());
        }
        if self.gap_interval == 0 || self.gap_duration == 0 {
            return Err("game.gap_interval and game.gap_duration must be > 0".to_string());
        }
        if self.tick_rate_hz <= 0.0 || self.snapshot_rate_hz <= 0.0 {
            return Err("game.tick_rate_hz and game.snapshot_rate_hz must be > 0".to_string());
        }
        if self.snapshot_rate_hz > self.tick_rate_hz {
            tracing::warn!(
                tick_rate = self.tick_rate_hz,
                snapshot_rate = self.snapshot_rate_hz,
                "Snapshot rate exceeds tick rate; snapshots will repeat state"
            );
        }
        Ok(())
    }
}
