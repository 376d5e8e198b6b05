use futures::{FutureExt, SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use kurve_core::curve::SteerSide;
use kurve_core::net::messages::{
    ClientMessage, JoinRoomMsg, JoinedRoom, LeaveRoomMsg, ServerMessage, SteerMsg,
};
use kurve_core::net::protocol::{
    PROTOCOL_VERSION, ProtocolError, decode_server_message, encode_client_message,
};

/// Errors from the native WebSocket client.
#[derive(Debug)]
pub enum ClientError {
    /// Transport failure, including a refused upgrade.
    WebSocket(tungstenite::Error),
    Protocol(ProtocolError),
    /// The server refused the join; carries its reason.
    JoinRefused(String),
    /// A frame other than JoinRoomResponse answered a join.
    UnexpectedReply,
    Closed,
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WebSocket(e) => write!(f, "WebSocket error: {e}"),
            Self::Protocol(e) => write!(f, "Protocol error: {e}"),
            Self::JoinRefused(reason) => write!(f, "Join refused: {reason}"),
            Self::UnexpectedReply => write!(f, "Expected JoinRoomResponse"),
            Self::Closed => write!(f, "Connection closed"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<tungstenite::Error> for ClientError {
    fn from(e: tungstenite::Error) -> Self {
        Self::WebSocket(e)
    }
}

impl From<ProtocolError> for ClientError {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

/// WebSocket client speaking the binary room protocol.
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    /// Connect to a server's `/ws` endpoint.
    pub async fn connect(url: &str) -> Result<Self, ClientError> {
        let (stream, _) = tokio_tungstenite::connect_async(url).await?;
        tracing::debug!(url, "WebSocket connected");
        Ok(Self { stream })
    }

    pub async fn send(&mut self, msg: &ClientMessage) -> Result<(), ClientError> {
        let data = encode_client_message(msg)?;
        self.stream.send(Message::Binary(data.into())).await?;
        Ok(())
    }

    /// Ask for a seat in `room_id` and wait for the answer.
    pub async fn join(&mut self, room_id: &str, nickname: &str) -> Result<JoinedRoom, ClientError> {
        self.send(&ClientMessage::JoinRoom(JoinRoomMsg {
            room_id: room_id.to_string(),
            nickname: nickname.to_string(),
            protocol_version: PROTOCOL_VERSION,
        }))
        .await?;

        match self.recv().await? {
            ServerMessage::JoinRoomResponse(resp) => match (resp.success, resp.room) {
                (true, Some(room)) => Ok(room),
                _ => Err(ClientError::JoinRefused(
                    resp.error.unwrap_or_else(|| "unknown error".to_string()),
                )),
            },
            _ => Err(ClientError::UnexpectedReply),
        }
    }

    pub async fn steer(&mut self, side: SteerSide, pressed: bool) -> Result<(), ClientError> {
        self.send(&ClientMessage::Steer(SteerMsg { side, pressed }))
            .await
    }

    pub async fn leave(&mut self) -> Result<(), ClientError> {
        self.send(&ClientMessage::LeaveRoom(LeaveRoomMsg {})).await
    }

    /// Wait for the next server message. Non-binary frames are skipped.
    pub async fn recv(&mut self) -> Result<ServerMessage, ClientError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Binary(data))) => return Ok(decode_server_message(&data)?),
                Some(Ok(Message::Close(_))) | None => return Err(ClientError::Closed),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    /// Every message already buffered, without waiting. Frames that fail to
    /// decode are logged and dropped.
    pub fn drain_messages(&mut self) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Some(Some(frame)) = self.stream.next().now_or_never() {
            match frame {
                Ok(Message::Binary(data)) => match decode_server_message(&data) {
                    Ok(msg) => out.push(msg),
                    Err(e) => tracing::warn!(error = %e, "Dropping undecodable frame"),
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => {},
                Err(e) => {
                    tracing::debug!(error = %e, "WebSocket error while draining");
                    break;
                },
            }
        }
        out
    }

    pub async fn close(mut self) -> Result<(), ClientError> {
        self.stream.close(None).await?;
        Ok(())
    }
}
