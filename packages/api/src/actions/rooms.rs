use tracing::debug;

use super::default::{reply, reply_error};
use crate::state::AppState;
use shared::models::events::{RoomPayload, ServerEvent};

/// Rooms are match rooms, so only the match's two players may join.
pub async fn handle_join_room(state: &AppState, user_id: &str, payload: RoomPayload) {
    if let Err(e) = state.match_service.get(&payload.room_id, user_id).await {
        debug!(user_id = %user_id, room_id = %payload.room_id, error = %e, "Room join refused");
        return reply_error(state, user_id, &format!("Cannot join room: {}", e)).await;
    }

    state.rooms.join(user_id, &payload.room_id).await;
    reply(
        state,
        user_id,
        ServerEvent::RoomJoined {
            room_id: payload.room_id,
        },
    )
    .await;
}

pub async fn handle_leave_room(state: &AppState, user_id: &str, payload: RoomPayload) {
    state.rooms.leave(user_id, &payload.room_id).await;
    reply(
        state,
        user_id,
        ServerEvent::RoomLeft {
            room_id: payload.room_id,
        },
    )
    .await;
}
