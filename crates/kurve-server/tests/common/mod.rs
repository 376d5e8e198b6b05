use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use kurve_core::net::messages::{ClientMessage, JoinRoomMsg, JoinRoomResponseMsg, ServerMessage};
use kurve_core::net::protocol::{PROTOCOL_VERSION, decode_server_message, encode_client_message};

use kurve_server::build_app;
use kurve_server::config::ServerConfig;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn new() -> Self {
        Self::from_config(ServerConfig::default()).await
    }

    /// A server whose countdowns last one second.
    pub async fn fast() -> Self {
        let mut config = ServerConfig::default();
        config.rooms.room.round_countdown_secs = 1;
        config.rooms.room.game_over_countdown_secs = 1;
        Self::from_config(config).await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (app, _state) = build_app(config);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

/// Connect a WebSocket client to the given URL.
pub async fn ws_connect(url: &str) -> WsStream {
    let (stream, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    stream
}

pub async fn ws_send_client_msg(stream: &mut WsStream, msg: &ClientMessage) {
    let encoded = encode_client_message(msg).unwrap();
    stream.send(Message::Binary(encoded.into())).await.unwrap();
}

/// Send a JoinRoom and return the response, successful or not.
pub async fn ws_join(stream: &mut WsStream, room_id: &str, nickname: &str) -> JoinRoomResponseMsg {
    ws_join_with_version(stream, room_id, nickname, PROTOCOL_VERSION).await
}

pub async fn ws_join_with_version(
    stream: &mut WsStream,
    room_id: &str,
    nickname: &str,
    protocol_version: u8,
) -> JoinRoomResponseMsg {
    let msg = ClientMessage::JoinRoom(JoinRoomMsg {
        room_id: room_id.to_string(),
        nickname: nickname.to_string(),
        protocol_version,
    });
    ws_send_client_msg(stream, &msg).await;

    match ws_read_server_msg(stream).await {
        ServerMessage::JoinRoomResponse(join) => join,
        other => panic!("Expected JoinRoomResponse, got: {other:?}"),
    }
}

/// Connect and join, asserting success.
pub async fn ws_connect_and_join(server: &TestServer, room_id: &str, nickname: &str) -> WsStream {
    let mut stream = ws_connect(&server.ws_url()).await;
    let resp = ws_join(&mut stream, room_id, nickname).await;
    assert!(resp.success, "Expected successful join: {resp:?}");
    stream
}

/// Read raw binary data from a WebSocket stream (5s timeout).
pub async fn ws_read_raw(stream: &mut WsStream) -> Vec<u8> {
    let deadline = Duration::from_secs(5);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => return data.to_vec(),
                Some(Ok(Message::Close(_))) => panic!("WebSocket closed unexpectedly"),
                Some(Err(e)) => panic!("WebSocket error: {e}"),
                None => panic!("WebSocket stream ended"),
                _ => continue,
            }
        }
    })
    .await
    .expect("Timed out waiting for WebSocket message")
}

/// Try to read a binary frame within `ms` milliseconds.
pub async fn ws_try_read_raw(stream: &mut WsStream, ms: u64) -> Option<Vec<u8>> {
    tokio::time::timeout(Duration::from_millis(ms), async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => return Some(data.to_vec()),
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return None,
                _ => continue,
            }
        }
    })
    .await
    .ok()
    .flatten()
}

pub async fn ws_read_server_msg(stream: &mut WsStream) -> ServerMessage {
    let data = ws_read_raw(stream).await;
    decode_server_message(&data).unwrap()
}

/// Read until `pred` matches, returning every message read (the match last).
pub async fn ws_read_until(
    stream: &mut WsStream,
    pred: impl Fn(&ServerMessage) -> bool,
) -> Vec<ServerMessage> {
    let mut seen = Vec::new();
    loop {
        let msg = ws_read_server_msg(stream).await;
        let done = pred(&msg);
        seen.push(msg);
        if done {
            return seen;
        }
    }
}
