use std::sync::atomic::Ordering;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

/// Structured health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub connections: ConnectionInfo,
    pub rooms: RoomInfo,
}

#[derive(Serialize)]
pub struct ConnectionInfo {
    pub websocket: usize,
}

#[derive(Serialize)]
pub struct RoomInfo {
    pub total: usize,
    /// Rooms with at least one player.
    pub active: usize,
    pub players: usize,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let websocket = state.ws_connection_count.load(Ordering::Relaxed);
    let summaries = state.rooms.summaries().await;
    let active = summaries.iter().filter(|s| !s.players.is_empty()).count();
    let players = summaries.iter().map(|s| s.players.len()).sum();
    let status = if state.rooms.any_stopped() {
        "degraded"
    } else {
        "healthy"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        connections: ConnectionInfo { websocket },
        rooms: RoomInfo {
            total: state.rooms.room_ids().len(),
            active,
            players,
        },
    })
}
