use serde::{Deserialize, Serialize};

use crate::curve::SteerSide;
use crate::player::Player;
use crate::room::{RoomEvent, RoomState};
use crate::simulation::Snapshot;

/// Network message type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    // Client -> Server
    JoinRoom = 0x01,
    LeaveRoom = 0x02,
    Steer = 0x03,

    // Server -> Client
    JoinRoomResponse = 0x10,
    PlayerJoined = 0x11,
    PlayerLeft = 0x12,
    RoundStarting = 0x13,
    Countdown = 0x14,
    RoundStarted = 0x15,
    PlayerDead = 0x16,
    RoundEnded = 0x17,
    GameEnded = 0x18,
    Reset = 0x19,
    Snapshot = 0x1A,
}

impl MessageType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Self::JoinRoom),
            0x02 => Some(Self::LeaveRoom),
            0x03 => Some(Self::Steer),
            0x10 => Some(Self::JoinRoomResponse),
            0x11 => Some(Self::PlayerJoined),
            0x12 => Some(Self::PlayerLeft),
            0x13 => Some(Self::RoundStarting),
            0x14 => Some(Self::Countdown),
            0x15 => Some(Self::RoundStarted),
            0x16 => Some(Self::PlayerDead),
            0x17 => Some(Self::RoundEnded),
            0x18 => Some(Self::GameEnded),
            0x19 => Some(Self::Reset),
            0x1A => Some(Self::Snapshot),
            _ => None,
        }
    }

    /// Whether clients are allowed to send this type.
    pub fn is_client_message(self) -> bool {
        (self as u8) < 0x10
    }
}

// ============================================================================
// Client -> Server
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinRoomMsg {
    pub room_id: String,
    pub nickname: String,
    pub protocol_version: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveRoomMsg {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SteerMsg {
    pub side: SteerSide,
    pub pressed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    JoinRoom(JoinRoomMsg),
    LeaveRoom(LeaveRoomMsg),
    Steer(SteerMsg),
}

// ============================================================================
// Server -> Client
// ============================================================================

/// Everything a client needs to render a room it just joined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinedRoom {
    pub room_id: String,
    pub state: RoomState,
    pub round: u32,
    pub score_limit: u32,
    pub width: f32,
    pub height: f32,
    pub players: Vec<Player>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinRoomResponseMsg {
    pub success: bool,
    pub error: Option<String>,
    pub room: Option<JoinedRoom>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerJoinedMsg {
    pub player: Player,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerLeftMsg {
    pub player: Player,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundStartingMsg {
    pub state: RoomState,
    pub countdown: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountdownMsg {
    pub seconds_left: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundStartedMsg {
    pub state: RoomState,
    pub round: u32,
    pub score_limit: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerDeadMsg {
    pub nickname: String,
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundEndedMsg {
    pub state: RoomState,
    pub winner: String,
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEndedMsg {
    pub state: RoomState,
    pub winner: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResetMsg {
    pub state: RoomState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMsg {
    pub curves: Snapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    JoinRoomResponse(JoinRoomResponseMsg),
    PlayerJoined(PlayerJoinedMsg),
    PlayerLeft(PlayerLeftMsg),
    RoundStarting(RoundStartingMsg),
    Countdown(CountdownMsg),
    RoundStarted(RoundStartedMsg),
    PlayerDead(PlayerDeadMsg),
    RoundEnded(RoundEndedMsg),
    GameEnded(GameEndedMsg),
    Reset(ResetMsg),
    Snapshot(SnapshotMsg),
}

impl From<RoomEvent> for ServerMessage {
    fn from(event: RoomEvent) -> Self {
        match event {
            RoomEvent::PlayerJoined(player) => Self::PlayerJoined(PlayerJoinedMsg { player }),
            RoomEvent::PlayerLeft(player) => Self::PlayerLeft(PlayerLeftMsg { player }),
            RoomEvent::RoundStarting { state, countdown } => {
                Self::RoundStarting(RoundStartingMsg { state, countdown })
            },
            RoomEvent::Countdown { seconds_left } => Self::Countdown(CountdownMsg { seconds_left }),
            RoomEvent::RoundStarted {
                state,
                round,
                score_limit,
            } => Self::RoundStarted(RoundStartedMsg {
                state,
                round,
                score_limit,
            }),
            RoomEvent::PlayerDead { nickname, points } => {
                Self::PlayerDead(PlayerDeadMsg { nickname, points })
            },
            RoomEvent::RoundEnded {
                state,
                winner,
                points,
            } => Self::RoundEnded(RoundEndedMsg {
                state,
                winner,
                points,
            }),
            RoomEvent::GameEnded { state, winner } => {
                Self::GameEnded(GameEndedMsg { state, winner })
            },
            RoomEvent::Reset { state } => Self::Reset(ResetMsg { state }),
            RoomEvent::Snapshot(curves) => Self::Snapshot(SnapshotMsg { curves }),
        }
    }
}
