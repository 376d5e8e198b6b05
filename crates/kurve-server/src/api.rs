use axum::extract::{Path, State};
use axum::response::Json;

use kurve_core::room::RoomSummary;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/v1/rooms: every room with its roster and scores.
pub async fn list_rooms(State(state): State<AppState>) -> Json<Vec<RoomSummary>> {
    Json(state.rooms.summaries().await)
}

/// GET /api/v1/rooms/{room_id}
pub async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomSummary>, AppError> {
    if !state.rooms.contains(&room_id) {
        return Err(AppError::NotFound(format!("Room {room_id} does not exist")));
    }
    state
        .rooms
        .summary(&room_id)
        .await
        .map(Json)
        .map_err(AppError::Internal)
}
