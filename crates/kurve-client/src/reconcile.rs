use std::collections::HashMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use kurve_core::curve::{GapLine, wrap_coord};
use kurve_core::player::{Player, PlayerColor};
use kurve_core::simulation::{CurveSnapshot, Snapshot};

use crate::trail::{BACKGROUND, GAP_COLOR, Stroke, StrokeKind, TrailCanvas};

/// How hard a snapshot pulls the predicted position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Per-axis divergence above which the client snaps instead of blending.
    pub correction_threshold: f32,
    /// Fraction of the divergence corrected per snapshot when blending.
    pub smoothing: f32,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            correction_threshold: 3.0,
            smoothing: 0.25,
        }
    }
}

/// Client-side view of one remote curve.
#[derive(Debug, Clone)]
pub struct ClientCurve {
    pub color: PlayerColor,
    pub position: Vec2,
    /// Degrees, 0 = up, increasing clockwise.
    pub heading: f32,
    pub speed: f32,
    pub steer_rate: f32,
    pub thickness: f32,
    pub gap: bool,
    pub is_dead: bool,
    observed: bool,
    /// Predicted pieces drawn while the current gap is open.
    gap_pieces: Vec<(Vec2, Vec2)>,
}

impl ClientCurve {
    pub fn new(color: PlayerColor) -> Self {
        Self {
            color,
            position: Vec2::ZERO,
            heading: 0.0,
            speed: 0.0,
            steer_rate: 0.0,
            thickness: 0.0,
            gap: false,
            is_dead: false,
            observed: false,
            gap_pieces: Vec::new(),
        }
    }

    /// Whether any snapshot has reported this curve yet.
    pub fn is_observed(&self) -> bool {
        self.observed
    }

    pub fn gap_pieces(&self) -> &[(Vec2, Vec2)] {
        &self.gap_pieces
    }

    /// Pull the predicted position toward `reported`, axis by axis.
    fn correct(&mut self, reported: Vec2, config: &ReconcileConfig) {
        if !self.observed {
            self.position = reported;
            self.observed = true;
            return;
        }
        self.position.x = correct_axis(self.position.x, reported.x, config);
        self.position.y = correct_axis(self.position.y, reported.y, config);
    }

    fn apply(&mut self, snap: &CurveSnapshot, config: &ReconcileConfig, canvas: &mut impl TrailCanvas) {
        self.correct(Vec2::new(snap.x, snap.y), config);
        self.heading = snap.heading;
        self.thickness = snap.thickness;
        self.speed = snap.speed;
        self.steer_rate = snap.steer_rate;

        if self.gap && !snap.gap {
            self.fill_gap(snap.gap_line, canvas);
        }
        self.gap = snap.gap;
    }

    /// Paint over the preview of the gap that just closed. Uses the server's
    /// segment when it arrived, otherwise the locally predicted pieces.
    fn fill_gap(&mut self, line: Option<GapLine>, canvas: &mut impl TrailCanvas) {
        let width = self.thickness + 1.0;
        match line {
            Some(line) => canvas.stroke(Stroke {
                kind: StrokeKind::Fill,
                from: Vec2::new(line.start_x, line.start_y),
                to: Vec2::new(line.end_x, line.end_y),
                width,
                color: BACKGROUND,
            }),
            None => {
                for &(from, to) in &self.gap_pieces {
                    canvas.stroke(Stroke {
                        kind: StrokeKind::Fill,
                        from,
                        to,
                        width,
                        color: BACKGROUND,
                    });
                }
            },
        }
        self.gap_pieces.clear();
    }

    /// Dead-reckon forward by `dt` and return the stroke covering the move.
    fn predict(&mut self, dt: f32, arena: Vec2) -> Stroke {
        let rad = self.heading.to_radians();
        let from = self.position;
        let to = from + Vec2::new(rad.sin(), -rad.cos()) * self.speed * dt;

        let (kind, color) = if self.gap {
            self.gap_pieces.push((from, to));
            (StrokeKind::Gap, GAP_COLOR)
        } else {
            (StrokeKind::Trail, self.color)
        };

        self.position = Vec2::new(wrap_coord(to.x, arena.x), wrap_coord(to.y, arena.y));
        Stroke {
            kind,
            from,
            to,
            width: self.thickness,
            color,
        }
    }
}

fn correct_axis(predicted: f32, reported: f32, config: &ReconcileConfig) -> f32 {
    let diff = reported - predicted;
    if diff.abs() > config.correction_threshold {
        reported
    } else {
        predicted + diff * config.smoothing
    }
}

/// Every curve the client renders for one round, predicted between snapshots.
pub struct ClientGame {
    arena: Vec2,
    config: ReconcileConfig,
    curves: HashMap<String, ClientCurve>,
    running: bool,
}

impl ClientGame {
    pub fn new(width: f32, height: f32) -> Self {
        Self::with_config(width, height, ReconcileConfig::default())
    }

    pub fn with_config(width: f32, height: f32, config: ReconcileConfig) -> Self {
        Self {
            arena: Vec2::new(width, height),
            config,
            curves: HashMap::new(),
            running: false,
        }
    }

    pub fn arena(&self) -> Vec2 {
        self.arena
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn curve(&self, nickname: &str) -> Option<&ClientCurve> {
        self.curves.get(nickname)
    }

    pub fn curves(&self) -> &HashMap<String, ClientCurve> {
        &self.curves
    }

    /// Begin a round with a fresh curve per player and a clean arena.
    pub fn start(&mut self, players: &[Player], canvas: &mut impl TrailCanvas) {
        self.curves = players
            .iter()
            .map(|p| (p.nickname.clone(), ClientCurve::new(p.color)))
            .collect();
        canvas.clear();
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn set_player_dead(&mut self, nickname: &str) {
        if let Some(curve) = self.curves.get_mut(nickname) {
            curve.is_dead = true;
        }
    }

    /// Fold a server snapshot into the predicted curves. Unknown and dead
    /// curves are skipped.
    pub fn apply_snapshot(&mut self, snapshot: &Snapshot, canvas: &mut impl TrailCanvas) {
        for (nickname, snap) in snapshot {
            match self.curves.get_mut(nickname) {
                Some(curve) if !curve.is_dead => curve.apply(snap, &self.config, canvas),
                Some(_) => {},
                None => tracing::trace!(nickname = %nickname, "Snapshot for unknown curve"),
            }
        }
    }

    /// Advance every live curve by `dt` seconds and draw the move. Curves
    /// no snapshot has placed yet are left alone.
    pub fn advance(&mut self, dt: f32, canvas: &mut impl TrailCanvas) {
        if !self.running {
            return;
        }
        for curve in self.curves.values_mut() {
            if curve.is_dead || !curve.observed {
                continue;
            }
            canvas.stroke(curve.predict(dt, self.arena));
        }
    }
}
