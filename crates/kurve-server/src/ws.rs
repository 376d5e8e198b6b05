use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};

use kurve_core::net::messages::ClientMessage;
use kurve_core::net::protocol::{
    MAX_MESSAGE_SIZE, PROTOCOL_VERSION, decode_client_message, decode_message_type,
};

use crate::room_manager::RoomManager;
use crate::state::{AppState, ConnectionGuard};

pub async fn ws_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Result<Response, StatusCode> {
    let max_ws = state.config.limits.max_ws_connections;
    let Some(guard) = ConnectionGuard::try_acquire(&state.ws_connection_count, max_ws) else {
        tracing::warn!(max = max_ws, "WS connection limit reached");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    Ok(ws
        .max_message_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_socket(socket, state, guard))
        .into_response())
}

/// Where an accepted connection sits.
struct Seat {
    room_id: String,
    nickname: String,
    conn_id: u64,
}

async fn handle_socket(socket: WebSocket, state: AppState, _guard: ConnectionGuard) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Wait for the first message: must be a JoinRoom.
    let first_msg = match ws_receiver.next().await {
        Some(Ok(Message::Binary(data))) => data,
        _ => return,
    };

    let join = match decode_client_message(&first_msg) {
        Ok(ClientMessage::JoinRoom(join)) => join,
        Ok(_) => {
            send_join_error(&mut ws_sender, "First message must be JoinRoom").await;
            return;
        },
        Err(e) => {
            tracing::debug!(error = %e, "Undecodable first frame");
            return;
        },
    };

    if join.protocol_version != PROTOCOL_VERSION {
        send_join_error(
            &mut ws_sender,
            &format!(
                "Protocol version mismatch: client={}, server={}",
                join.protocol_version, PROTOCOL_VERSION
            ),
        )
        .await;
        return;
    }

    let conn_id = state.alloc_connection_id();
    let (tx, rx) = mpsc::channel::<Bytes>(state.config.limits.player_message_buffer);

    let joined = match state
        .rooms
        .join(&join.room_id, &join.nickname, conn_id, tx)
        .await
    {
        Ok(joined) => joined,
        Err(e) => {
            tracing::info!(room = %join.room_id, nickname = %join.nickname, error = %e, "Join refused");
            send_join_error(&mut ws_sender, &e.to_string()).await;
            return;
        },
    };

    let seat = Seat {
        room_id: join.room_id,
        nickname: join.nickname,
        conn_id,
    };

    // The response goes out before the writer starts, so it precedes every
    // room broadcast queued in `rx`.
    let sent = match RoomManager::make_join_response(joined) {
        Ok(response) => ws_sender.send(Message::Binary(response.into())).await.is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode JoinRoomResponse");
            false
        },
    };

    if sent {
        tracing::info!(room = %seat.room_id, nickname = %seat.nickname, conn_id, "Player connected");
        let writer = spawn_writer(ws_sender, rx);
        read_loop(&mut ws_receiver, &state, &seat).await;
        writer.abort();
    }

    state.rooms.leave(&seat.room_id, &seat.nickname, seat.conn_id);
    tracing::info!(room = %seat.room_id, nickname = %seat.nickname, conn_id, "Player disconnected");
}

async fn send_join_error(ws_sender: &mut SplitSink<WebSocket, Message>, error: &str) {
    if let Ok(response) = RoomManager::make_join_error(error)
        && let Err(e) = ws_sender.send(Message::Binary(response.into())).await
    {
        tracing::warn!(error = %e, "Failed to send join error response");
    }
}

fn spawn_writer(
    mut ws_sender: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Bytes>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(data) = rx.recv().await {
            if ws_sender.send(Message::Binary(data)).await.is_err() {
                break;
            }
        }
        let _ = ws_sender.close().await;
    })
}

/// Inbound frame allowance for one connection, counted over fixed windows.
/// Frames past the allowance are dropped until the next window opens.
struct FrameBudget {
    allowance: u32,
    window: Duration,
    window_start: Instant,
    seen: u32,
}

impl FrameBudget {
    fn per_second(allowance: u32) -> Self {
        Self {
            allowance,
            window: Duration::from_secs(1),
            window_start: Instant::now(),
            seen: 0,
        }
    }

    /// Count one frame. Returns false when the window's allowance is spent.
    fn admit(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.window_start) >= self.window {
            self.window_start = now;
            self.seen = 0;
        }
        self.seen = self.seen.saturating_add(1);
        self.seen <= self.allowance
    }

    /// True for the first frame refused in the current window.
    fn just_exhausted(&self) -> bool {
        self.seen == self.allowance.saturating_add(1)
    }
}

/// Route client frames until the client leaves or the socket closes.
async fn read_loop(ws_receiver: &mut SplitStream<WebSocket>, state: &AppState, seat: &Seat) {
    let mut budget = FrameBudget::per_second(state.config.limits.ws_frames_per_sec);
    let room = seat.room_id.as_str();
    let nickname = seat.nickname.as_str();

    while let Some(Ok(msg)) = ws_receiver.next().await {
        let data = match msg {
            Message::Binary(d) => d,
            Message::Close(_) => break,
            _ => continue,
        };

        if !budget.admit() {
            if budget.just_exhausted() {
                tracing::warn!(room, nickname, "Frame budget spent, dropping until next window");
            }
            continue;
        }

        if data.is_empty() || data.len() > MAX_MESSAGE_SIZE {
            continue;
        }

        let msg_type = match decode_message_type(&data) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(room, nickname, error = %e, "Rejected frame");
                continue;
            },
        };

        if !msg_type.is_client_message() {
            tracing::warn!(
                room,
                nickname,
                ?msg_type,
                "Rejected server-only message from client"
            );
            continue;
        }

        match decode_client_message(&data) {
            Ok(ClientMessage::Steer(steer)) => {
                state
                    .rooms
                    .steer(room, nickname, seat.conn_id, steer.side, steer.pressed);
            },
            Ok(ClientMessage::LeaveRoom(_)) => break,
            Ok(ClientMessage::JoinRoom(_)) => {
                tracing::debug!(room, nickname, "Ignoring JoinRoom from seated player");
            },
            Err(e) => {
                tracing::warn!(room, nickname, ?msg_type, error = %e, "Rejected frame");
            },
        }
    }
}
