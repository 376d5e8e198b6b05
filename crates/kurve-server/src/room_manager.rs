use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use kurve_core::curve::SteerSide;
use kurve_core::net::messages::{JoinRoomResponseMsg, JoinedRoom, ServerMessage};
use kurve_core::net::protocol::{ProtocolError, encode_server_message};
use kurve_core::room::{JoinError, Room, RoomSummary};

use crate::config::ServerConfig;
use crate::game_loop::{PlayerSender, RoomCommand, spawn_room};

struct RoomHandle {
    commands: mpsc::UnboundedSender<RoomCommand>,
    task: JoinHandle<()>,
}

/// The fixed set of named rooms, each running in its own task.
///
/// The manager only routes; every room's state is owned by its task, so no
/// lock is ever held across rooms.
pub struct RoomManager {
    rooms: HashMap<String, RoomHandle>,
    /// Room ids in configuration order, for listings.
    order: Vec<String>,
}

impl RoomManager {
    pub fn new(config: &ServerConfig) -> Self {
        let room_config = &config.rooms.room;
        let mut rooms = HashMap::new();
        let mut order = Vec::new();
        for name in &config.rooms.names {
            if rooms.contains_key(name) {
                continue;
            }
            let room = Room::new(name.clone(), room_config.clone(), config.game.clone());
            let (commands, task) = spawn_room(room);
            rooms.insert(name.clone(), RoomHandle { commands, task });
            order.push(name.clone());
        }
        Self { rooms, order }
    }

    pub fn room_ids(&self) -> &[String] {
        &self.order
    }

    pub fn contains(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Ask a room to enroll `nickname`. On success the room starts
    /// broadcasting to `sender`.
    pub async fn join(
        &self,
        room_id: &str,
        nickname: &str,
        conn_id: u64,
        sender: PlayerSender,
    ) -> Result<JoinedRoom, JoinError> {
        let handle = self
            .rooms
            .get(room_id)
            .ok_or_else(|| JoinError::RoomNotFound(room_id.to_string()))?;
        let (reply, reply_rx) = oneshot::channel();
        let cmd = RoomCommand::Join {
            nickname: nickname.to_string(),
            conn_id,
            sender,
            reply,
        };
        if handle.commands.send(cmd).is_err() {
            tracing::warn!(room = room_id, "Room task is gone, refusing join");
            return Err(JoinError::RoomNotFound(room_id.to_string()));
        }
        reply_rx.await.unwrap_or_else(|_| {
            tracing::warn!(room = room_id, "Room task dropped a join reply");
            Err(JoinError::RoomNotFound(room_id.to_string()))
        })
    }

    pub fn leave(&self, room_id: &str, nickname: &str, conn_id: u64) {
        self.send(
            room_id,
            RoomCommand::Leave {
                nickname: nickname.to_string(),
                conn_id,
            },
        );
    }

    pub fn steer(&self, room_id: &str, nickname: &str, conn_id: u64, side: SteerSide, pressed: bool) {
        self.send(
            room_id,
            RoomCommand::Steer {
                nickname: nickname.to_string(),
                conn_id,
                side,
                pressed,
            },
        );
    }

    /// Current summary of one room.
    pub async fn summary(&self, room_id: &str) -> Result<RoomSummary, String> {
        let handle = self
            .rooms
            .get(room_id)
            .ok_or_else(|| format!("Room {room_id} does not exist"))?;
        let (reply, reply_rx) = oneshot::channel();
        handle
            .commands
            .send(RoomCommand::Status { reply })
            .map_err(|_| format!("Room {room_id} is not running"))?;
        reply_rx
            .await
            .map_err(|_| format!("Room {room_id} is not responding"))
    }

    /// Summaries of every running room, in configuration order.
    pub async fn summaries(&self) -> Vec<RoomSummary> {
        let mut out = Vec::with_capacity(self.order.len());
        for id in &self.order {
            match self.summary(id).await {
                Ok(summary) => out.push(summary),
                Err(e) => tracing::warn!(room = %id, error = %e, "Skipping room in listing"),
            }
        }
        out
    }

    /// Stop every room task.
    pub fn shutdown(&self) {
        for id in &self.order {
            self.send(id, RoomCommand::Stop);
        }
    }

    /// Whether any room task has exited.
    pub fn any_stopped(&self) -> bool {
        self.rooms.values().any(|h| h.task.is_finished())
    }

    /// Build a successful JoinRoomResponse.
    pub fn make_join_response(room: JoinedRoom) -> Result<Vec<u8>, ProtocolError> {
        encode_server_message(&ServerMessage::JoinRoomResponse(JoinRoomResponseMsg {
            success: true,
            error: None,
            room: Some(room),
        }))
    }

    /// Build a failed JoinRoomResponse.
    pub fn make_join_error(error: &str) -> Result<Vec<u8>, ProtocolError> {
        encode_server_message(&ServerMessage::JoinRoomResponse(JoinRoomResponseMsg {
            success: false,
            error: Some(error.to_string()),
            room: None,
        }))
    }

    fn send(&self, room_id: &str, cmd: RoomCommand) {
        if let Some(handle) = self.rooms.get(room_id)
            && handle.commands.send(cmd).is_err()
        {
            tracing::debug!(room = room_id, "Room task is gone, dropping command");
        }
    }
}
