use serde::{Deserialize, Serialize};

use super::messages::{
    ClientMessage, CountdownMsg, GameEndedMsg, JoinRoomMsg, JoinRoomResponseMsg, LeaveRoomMsg,
    MessageType, PlayerDeadMsg, PlayerJoinedMsg, PlayerLeftMsg, ResetMsg, RoundEndedMsg,
    RoundStartedMsg, RoundStartingMsg, ServerMessage, SnapshotMsg, SteerMsg,
};

/// Current protocol version. Joins carrying any other version are refused.
pub const PROTOCOL_VERSION: u8 = 1;

/// Maximum message size in bytes, type prefix included.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024; // 64 KiB

#[derive(Debug)]
pub enum ProtocolError {
    EmptyMessage,
    UnknownMessageType(u8),
    PayloadTooLarge(usize),
    SerializeError(String),
    DeserializeError(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "empty message"),
            Self::UnknownMessageType(b) => write!(f, "unknown message type: 0x{b:02x}"),
            Self::PayloadTooLarge(size) => {
                write!(
                    f,
                    "payload too large: {size} bytes (max {MAX_MESSAGE_SIZE})"
                )
            },
            Self::SerializeError(e) => write!(f, "serialize error: {e}"),
            Self::DeserializeError(e) => write!(f, "deserialize error: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Encode a serializable payload behind a 1-byte type prefix.
pub fn encode_message<T: Serialize>(
    msg_type: MessageType,
    payload: &T,
) -> Result<Vec<u8>, ProtocolError> {
    let payload_bytes =
        rmp_serde::to_vec(payload).map_err(|e| ProtocolError::SerializeError(e.to_string()))?;
    let total = 1 + payload_bytes.len();
    if total > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(total));
    }
    let mut buf = Vec::with_capacity(total);
    buf.push(msg_type as u8);
    buf.extend_from_slice(&payload_bytes);
    Ok(buf)
}

pub fn encode_client_message(msg: &ClientMessage) -> Result<Vec<u8>, ProtocolError> {
    match msg {
        ClientMessage::JoinRoom(m) => encode_message(MessageType::JoinRoom, m),
        ClientMessage::LeaveRoom(m) => encode_message(MessageType::LeaveRoom, m),
        ClientMessage::Steer(m) => encode_message(MessageType::Steer, m),
    }
}

pub fn encode_server_message(msg: &ServerMessage) -> Result<Vec<u8>, ProtocolError> {
    match msg {
        ServerMessage::JoinRoomResponse(m) => encode_message(MessageType::JoinRoomResponse, m),
        ServerMessage::PlayerJoined(m) => encode_message(MessageType::PlayerJoined, m),
        ServerMessage::PlayerLeft(m) => encode_message(MessageType::PlayerLeft, m),
        ServerMessage::RoundStarting(m) => encode_message(MessageType::RoundStarting, m),
        ServerMessage::Countdown(m) => encode_message(MessageType::Countdown, m),
        ServerMessage::RoundStarted(m) => encode_message(MessageType::RoundStarted, m),
        ServerMessage::PlayerDead(m) => encode_message(MessageType::PlayerDead, m),
        ServerMessage::RoundEnded(m) => encode_message(MessageType::RoundEnded, m),
        ServerMessage::GameEnded(m) => encode_message(MessageType::GameEnded, m),
        ServerMessage::Reset(m) => encode_message(MessageType::Reset, m),
        ServerMessage::Snapshot(m) => encode_message(MessageType::Snapshot, m),
    }
}

/// Extract the message type byte from raw wire data.
pub fn decode_message_type(data: &[u8]) -> Result<MessageType, ProtocolError> {
    let Some(&first) = data.first() else {
        return Err(ProtocolError::EmptyMessage);
    };
    MessageType::from_byte(first).ok_or(ProtocolError::UnknownMessageType(first))
}

/// Decode the MessagePack payload following the type prefix.
pub fn decode_payload<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, ProtocolError> {
    let Some(payload) = data.get(1..) else {
        return Err(ProtocolError::EmptyMessage);
    };
    rmp_serde::from_slice(payload).map_err(|e| ProtocolError::DeserializeError(e.to_string()))
}

pub fn decode_client_message(data: &[u8]) -> Result<ClientMessage, ProtocolError> {
    match decode_message_type(data)? {
        MessageType::JoinRoom => Ok(ClientMessage::JoinRoom(decode_payload::<JoinRoomMsg>(
            data,
        )?)),
        MessageType::LeaveRoom => Ok(ClientMessage::LeaveRoom(decode_payload::<LeaveRoomMsg>(
            data,
        )?)),
        MessageType::Steer => Ok(ClientMessage::Steer(decode_payload::<SteerMsg>(data)?)),
        other => Err(ProtocolError::UnknownMessageType(other as u8)),
    }
}

pub fn decode_server_message(data: &[u8]) -> Result<ServerMessage, ProtocolError> {
    match decode_message_type(data)? {
        MessageType::JoinRoomResponse => Ok(ServerMessage::JoinRoomResponse(decode_payload::<
            JoinRoomResponseMsg,
        >(data)?)),
        MessageType::PlayerJoined => Ok(ServerMessage::PlayerJoined(decode_payload::<
            PlayerJoinedMsg,
        >(data)?)),
        MessageType::PlayerLeft => Ok(ServerMessage::PlayerLeft(decode_payload::<PlayerLeftMsg>(
            data,
        )?)),
        MessageType::RoundStarting => Ok(ServerMessage::RoundStarting(decode_payload::<
            RoundStartingMsg,
        >(data)?)),
        MessageType::Countdown => Ok(ServerMessage::Countdown(decode_payload::<CountdownMsg>(
            data,
        )?)),
        MessageType::RoundStarted => Ok(ServerMessage::RoundStarted(decode_payload::<
            RoundStartedMsg,
        >(data)?)),
        MessageType::PlayerDead => Ok(ServerMessage::PlayerDead(decode_payload::<PlayerDeadMsg>(
            data,
        )?)),
        MessageType::RoundEnded => Ok(ServerMessage::RoundEnded(decode_payload::<RoundEndedMsg>(
            data,
        )?)),
        MessageType::GameEnded => Ok(ServerMessage::GameEnded(decode_payload::<GameEndedMsg>(
            data,
        )?)),
        MessageType::Reset => Ok(ServerMessage::Reset(decode_payload::<ResetMsg>(data)?)),
        MessageType::Snapshot => Ok(ServerMessage::Snapshot(decode_payload::<SnapshotMsg>(
            data,
        )?)),
        other => Err(ProtocolError::UnknownMessageType(other as u8)),
    }
}
