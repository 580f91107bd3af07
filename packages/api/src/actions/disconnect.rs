use tracing::info;

use crate::state::AppState;

/// Queue entries are left alone: waiting for a match does not require a live socket.
pub async fn handle_disconnect(state: &AppState, user_id: &str, connection_id: &str) {
    if state
        .registry
        .deregister_connection(user_id, connection_id)
        .await
    {
        info!(user_id = %user_id, connection_id = %connection_id, "WebSocket connection disconnected");
    }
}
