use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// A player enrolled in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub nickname: String,
    pub color: PlayerColor,
    pub score: u32,
    /// Enrolled in the round currently being played.
    pub is_playing: bool,
    /// Died during the current round.
    pub is_dead: bool,
}

impl Player {
    pub fn new(nickname: impl Into<String>, color: PlayerColor) -> Self {
        Self {
            nickname: nickname.into(),
            color,
            score: 0,
            is_playing: false,
            is_dead: false,
        }
    }
}

/// Trail color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Default for PlayerColor {
    fn default() -> Self {
        Self::PALETTE[0]
    }
}

impl PlayerColor {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Colors handed out to joining players, in order.
    pub const PALETTE: &[PlayerColor] = &[
        PlayerColor::rgb(255, 0, 0),   // red
        PlayerColor::rgb(0, 255, 0),   // green
        PlayerColor::rgb(0, 0, 255),   // blue
        PlayerColor::rgb(255, 255, 0), // yellow
        PlayerColor::rgb(0, 255, 255), // cyan
        PlayerColor::rgb(255, 255, 255), // white
        PlayerColor::rgb(255, 0, 255), // magenta
        PlayerColor::rgb(255, 128, 0), // orange
    ];

    /// CSS-style `#rrggbb`.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Ordered pool of unused colors. Joining players take from the front and
/// leaving players put their color back at the front, so a rejoin right
/// after a leave gets the same color.
#[derive(Debug, Clone)]
pub struct ColorPool {
    free: VecDeque<PlayerColor>,
}

impl ColorPool {
    /// A pool holding the first `size` palette colors.
    pub fn new(size: usize) -> Self {
        Self {
            free: PlayerColor::PALETTE.iter().take(size).copied().collect(),
        }
    }

    pub fn take(&mut self) -> Option<PlayerColor> {
        self.free.pop_front()
    }

    pub fn give_back(&mut self, color: PlayerColor) {
        self.free.push_front(color);
    }

    pub fn len(&self) -> usize {
        self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }

    pub fn peek(&self) -> Option<PlayerColor> {
        self.free.front().copied()
    }
}
