use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::grid::{Cell, CollisionGrid};

/// Which steering key a player is holding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SteerSide {
    Left,
    Right,
}

/// Endpoints of the most recent gap, sent once so clients can fill it in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GapLine {
    pub start_x: f32,
    pub start_y: f32,
    pub end_x: f32,
    pub end_y: f32,
}

/// Gap bookkeeping. Exactly one counter is live at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapState {
    /// Trail is drawn and collidable; a gap opens when `cooldown` hits zero.
    Drawing { cooldown: u32 },
    /// Trail is invisible and uncollidable for `remaining` more ticks.
    Open { remaining: u32 },
}

impl GapState {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }
}

/// One player's trail head and the kinematic state producing it.
#[derive(Debug, Clone)]
pub struct Curve {
    pub x: f32,
    pub y: f32,
    /// Degrees, 0 = up, increasing clockwise.
    pub heading: f32,
    pub speed: f32,
    pub steer_rate: f32,
    pub thickness: f32,
    pub alive: bool,
    pub steering_left: bool,
    pub steering_right: bool,
    gap: GapState,
    gap_line: GapLine,
    fill_ready: bool,
    pub(crate) last_cell: Option<Cell>,
}

impl Curve {
    /// Spawn a curve at `(x, y)` heading up, with its gap timer freshly armed.
    pub fn new(x: f32, y: f32, config: &GameConfig) -> Self {
        Self {
            x,
            y,
            heading: 0.0,
            speed: config.curve_speed,
            steer_rate: config.steer_rate,
            thickness: config.thickness,
            alive: true,
            steering_left: false,
            steering_right: false,
            gap: GapState::Drawing {
                cooldown: config.gap_interval,
            },
            gap_line: GapLine::default(),
            fill_ready: false,
            last_cell: None,
        }
    }

    pub fn gap_state(&self) -> GapState {
        self.gap
    }

    pub fn is_gap_open(&self) -> bool {
        self.gap.is_open()
    }

    pub fn last_cell(&self) -> Option<Cell> {
        self.last_cell
    }

    /// Record a held/released steering key.
    pub fn set_steering(&mut self, side: SteerSide, pressed: bool) {
        match side {
            SteerSide::Left => self.steering_left = pressed,
            SteerSide::Right => self.steering_right = pressed,
        }
    }

    /// Hand out the last closed gap segment if it has not been delivered yet.
    pub fn take_gap_fill(&mut self) -> Option<GapLine> {
        if self.fill_ready {
            self.fill_ready = false;
            Some(self.gap_line)
        } else {
            None
        }
    }

    /// Advance one tick of `dt` seconds: steer, move, wrap, run gap
    /// bookkeeping, then write the trail into `grid`. Leaves `alive` false if
    /// the head landed on an occupied cell.
    pub fn update(&mut self, dt: f32, config: &GameConfig, grid: &mut CollisionGrid) {
        if !self.alive {
            return;
        }

        let turn = match (self.steering_left, self.steering_right) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        };
        self.heading = wrap_coord(self.heading + self.steer_rate * dt * turn, 360.0);

        let rad = self.heading.to_radians();
        let pre_x = self.x + rad.sin() * self.speed * dt;
        let pre_y = self.y - rad.cos() * self.speed * dt;

        self.x = wrap_coord(pre_x, config.arena_width);
        self.y = wrap_coord(pre_y, config.arena_height);
        let wrapped = self.x != pre_x || self.y != pre_y;

        self.advance_gap((pre_x, pre_y), wrapped, config);

        if self.gap.is_open() {
            return;
        }

        // Off-grid heads neither collide nor write.
        let Some(cell) = grid.cell_at(self.x, self.y) else {
            return;
        };
        if self.last_cell == Some(cell) {
            return;
        }
        self.last_cell = Some(cell);
        if grid.insert(cell) >= 2 {
            self.alive = false;
        }
    }

    /// Count down the active gap counter. A gap that is still open when the
    /// curve wraps is shortened to end this tick, so no gap segment spans the
    /// wrap seam. Starts are recorded after the wrap and ends before it.
    fn advance_gap(&mut self, (pre_x, pre_y): (f32, f32), wrapped: bool, config: &GameConfig) {
        if wrapped
            && let GapState::Open { remaining } = &mut self.gap
            && *remaining > 1
        {
            *remaining = 1;
        }

        if let GapState::Drawing { cooldown } = &mut self.gap {
            *cooldown = cooldown.saturating_sub(1);
            if *cooldown == 0 {
                self.gap = GapState::Open {
                    remaining: config.gap_duration,
                };
                self.gap_line.start_x = self.x;
                self.gap_line.start_y = self.y;
            }
        }

        if let GapState::Open { remaining } = &mut self.gap {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                self.gap = GapState::Drawing {
                    cooldown: config.gap_interval,
                };
                self.gap_line.end_x = pre_x;
                self.gap_line.end_y = pre_y;
                self.fill_ready = true;
            }
        }
    }
}

/// Wrap a coordinate into `[0, size)`.
pub fn wrap_coord(v: f32, size: f32) -> f32 {
    let w = v.rem_euclid(size);
    if w >= size { 0.0 } else { w }
}
