use tracing::{info, warn};

use crate::state::AppState;
use shared::services::connection_registry::{OutgoingSender, RegisterOutcome};

/// Registers the socket's outgoing channel and puts the player back into the
/// rooms of their in-play matches. Returns the connection id.
pub async fn handle_connect(state: &AppState, user_id: &str, tx: OutgoingSender) -> String {
    let registration = state.registry.register(user_id, tx).await;
    info!(
        user_id = %user_id,
        connection_id = %registration.connection_id,
        replaced = registration.outcome == RegisterOutcome::Replaced,
        "WebSocket connection established"
    );

    state.player_service.touch(user_id).await;

    match state.match_service.active_room_ids(user_id).await {
        Ok(room_ids) => {
            for room_id in room_ids {
                state.rooms.join(user_id, &room_id).await;
            }
        }
        Err(e) => warn!(user_id = %user_id, error = %e, "Could not restore match rooms"),
    }

    registration.connection_id
}
