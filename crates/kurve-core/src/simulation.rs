use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::curve::{Curve, GapLine, SteerSide};
use crate::grid::CollisionGrid;

/// Something the simulation wants the room to know about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimEvent {
    /// A curve died. `alive_after` is the alive count right after this death.
    PlayerDead { nickname: String, alive_after: usize },
    /// Only one curve is left. Emitted once per round, after which the
    /// simulation stops itself.
    Winner { nickname: String },
}

/// Renderable state of one curve, as broadcast to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveSnapshot {
    pub x: f32,
    pub y: f32,
    pub heading: f32,
    pub thickness: f32,
    pub speed: f32,
    pub steer_rate: f32,
    pub gap: bool,
    /// Present exactly once after each gap closes.
    pub gap_line: Option<GapLine>,
}

/// Snapshot of every curve in a room, keyed by nickname.
pub type Snapshot = HashMap<String, CurveSnapshot>;

/// Authoritative physics for one room's round.
///
/// Owns its curves and its collision grid outright; nothing here is shared
/// between rooms. The runtime drives `tick` and `snapshot` on its own
/// schedule and calls `stop` when the round is torn down.
pub struct GameSimulation {
    config: GameConfig,
    curves: HashMap<String, Curve>,
    /// Nicknames in enrollment order; ticks visit curves in this order.
    order: Vec<String>,
    grid: Option<CollisionGrid>,
    alive_count: usize,
    running: bool,
}

impl GameSimulation {
    pub fn new(config: GameConfig) -> Self {
        Self {
            config,
            curves: HashMap::new(),
            order: Vec::new(),
            grid: None,
            alive_count: 0,
            running: false,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn alive_count(&self) -> usize {
        self.alive_count
    }

    pub fn curve(&self, nickname: &str) -> Option<&Curve> {
        self.curves.get(nickname)
    }

    pub fn grid(&self) -> Option<&CollisionGrid> {
        self.grid.as_ref()
    }

    /// Begin a round: one curve per nickname at a uniformly random position,
    /// heading up, on a freshly allocated grid.
    pub fn start<R: Rng + ?Sized>(&mut self, nicknames: &[String], rng: &mut R) {
        self.curves.clear();
        self.order.clear();

        for nickname in nicknames {
            if self.curves.contains_key(nickname) {
                continue;
            }
            let x = rng.random_range(0.0..self.config.arena_width);
            let y = rng.random_range(0.0..self.config.arena_height);
            self.curves
                .insert(nickname.clone(), Curve::new(x, y, &self.config));
            self.order.push(nickname.clone());
        }

        self.grid = Some(CollisionGrid::new(
            self.config.arena_width,
            self.config.arena_height,
            self.config.thickness,
        ));
        self.alive_count = self.order.len();
        self.running = true;
    }

    /// Halt the round. Safe to call any number of times.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Record a steering key change. Ignored when stopped or for unknown or
    /// dead curves.
    pub fn set_steering(&mut self, nickname: &str, side: SteerSide, pressed: bool) {
        if !self.running {
            return;
        }
        if let Some(curve) = self.curves.get_mut(nickname)
            && curve.alive
        {
            curve.set_steering(side, pressed);
        }
    }

    /// Drop a departed player's curve. Its trail stays on the grid.
    pub fn remove_curve(&mut self, nickname: &str) {
        if let Some(curve) = self.curves.remove(nickname) {
            self.order.retain(|n| n != nickname);
            if curve.alive {
                self.alive_count = self.alive_count.saturating_sub(1);
            }
        }
    }

    /// Advance every live curve by one fixed step.
    pub fn tick(&mut self) -> Vec<SimEvent> {
        let mut events = Vec::new();
        if !self.running {
            return events;
        }
        let Some(grid) = self.grid.as_mut() else {
            return events;
        };

        let dt = self.config.tick_dt();
        for nickname in &self.order {
            let Some(curve) = self.curves.get_mut(nickname) else {
                continue;
            };
            if !curve.alive {
                continue;
            }

            curve.update(dt, &self.config, grid);

            if !curve.alive {
                if self.alive_count > 1 {
                    self.alive_count -= 1;
                    events.push(SimEvent::PlayerDead {
                        nickname: nickname.clone(),
                        alive_after: self.alive_count,
                    });
                } else {
                    // The last curve standing survives whatever it hit.
                    curve.alive = true;
                }
            }
        }

        if self.alive_count <= 1 {
            self.running = false;
            let winner = self
                .order
                .iter()
                .find(|n| self.curves.get(*n).is_some_and(|c| c.alive));
            if let Some(nickname) = winner {
                events.push(SimEvent::Winner {
                    nickname: nickname.clone(),
                });
            } else {
                tracing::debug!("Simulation stopped with no curve left alive");
            }
        }

        events
    }

    /// Build the broadcast view of every curve. Each closed gap's segment is
    /// included in exactly one snapshot.
    pub fn snapshot(&mut self) -> Snapshot {
        self.order
            .iter()
            .filter_map(|nickname| {
                let curve = self.curves.get_mut(nickname)?;
                Some((
                    nickname.clone(),
                    CurveSnapshot {
                        x: curve.x,
                        y: curve.y,
                        heading: curve.heading,
                        thickness: curve.thickness,
                        speed: curve.speed,
                        steer_rate: curve.steer_rate,
                        gap: curve.is_gap_open(),
                        gap_line: curve.take_gap_fill(),
                    },
                ))
            })
            .collect()
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl GameSimulation {
    pub fn curve_mut(&mut self, nickname: &str) -> Option<&mut Curve> {
        self.curves.get_mut(nickname)
    }

    /// Teleport a curve, forgetting its last written cell.
    pub fn place_curve(&mut self, nickname: &str, x: f32, y: f32, heading: f32) {
        if let Some(curve) = self.curves.get_mut(nickname) {
            curve.x = x;
            curve.y = y;
            curve.heading = heading;
            curve.last_cell = None;
        }
    }

    /// Occupy the cell a curve will enter on its next unsteered tick and
    /// forget its last written cell, so that tick kills it.
    pub fn block_next_cell(&mut self, nickname: &str) {
        let dt = self.config.tick_dt();
        let (Some(curve), Some(grid)) = (self.curves.get_mut(nickname), self.grid.as_mut()) else {
            return;
        };
        curve.last_cell = None;
        let rad = curve.heading.to_radians();
        let x = crate::curve::wrap_coord(
            curve.x + rad.sin() * curve.speed * dt,
            self.config.arena_width,
        );
        let y = crate::curve::wrap_coord(
            curve.y - rad.cos() * curve.speed * dt,
            self.config.arena_height,
        );
        if let Some(cell) = grid.cell_at(x, y) {
            grid.insert(cell);
        }
    }
}
