use glam::Vec2;

use kurve_core::player::PlayerColor;

/// Color of strokes drawn while a gap is open.
pub const GAP_COLOR: PlayerColor = PlayerColor::rgb(0x55, 0x55, 0x55);

/// Arena background. Fill strokes paint over a closed gap's preview with it.
pub const BACKGROUND: PlayerColor = PlayerColor::rgb(0, 0, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrokeKind {
    /// Solid trail in the player's color.
    Trail,
    /// Preview of a trail piece drawn during a gap.
    Gap,
    /// Erases the preview of a gap once it has closed.
    Fill,
}

/// One line segment handed to a canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub kind: StrokeKind,
    pub from: Vec2,
    pub to: Vec2,
    pub width: f32,
    pub color: PlayerColor,
}

impl Stroke {
    /// Endpoints rounded to whole pixels, the same rounding the server uses
    /// for grid cells.
    pub fn pixels(&self) -> ((i32, i32), (i32, i32)) {
        (round_px(self.from), round_px(self.to))
    }
}

fn round_px(v: Vec2) -> (i32, i32) {
    ((0.5 + v.x) as i32, (0.5 + v.y) as i32)
}

/// Drawing surface for trails. Implemented by whatever renders the arena.
pub trait TrailCanvas {
    fn stroke(&mut self, stroke: Stroke);

    /// Wipe the whole arena.
    fn clear(&mut self);
}

/// Canvas that records what it was asked to draw. Useful headless and in tests.
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    strokes: Vec<Stroke>,
    clears: usize,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn of_kind(&self, kind: StrokeKind) -> impl Iterator<Item = &Stroke> {
        self.strokes.iter().filter(move |s| s.kind == kind)
    }

    /// How many times the arena was wiped.
    pub fn clears(&self) -> usize {
        self.clears
    }

    pub fn take(&mut self) -> Vec<Stroke> {
        std::mem::take(&mut self.strokes)
    }
}

impl TrailCanvas for RecordingCanvas {
    fn stroke(&mut self, stroke: Stroke) {
        self.strokes.push(stroke);
    }

    fn clear(&mut self) {
        self.strokes.clear();
        self.clears += 1;
    }
}
