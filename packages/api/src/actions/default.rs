use tracing::debug;

use super::{presence, relay, rooms};
use crate::state::AppState;
use shared::models::events::{ClientMessage, ServerEvent};

/// Sends `event` back to the caller's own socket.
pub async fn reply(state: &AppState, user_id: &str, event: ServerEvent) {
    if let Err(e) = state.registry.send(user_id, event).await {
        debug!(error = %e, "Reply not delivered");
    }
}

pub async fn reply_error(state: &AppState, user_id: &str, message: &str) {
    reply(state, user_id, ServerEvent::error(message)).await;
}

/// Routes one text frame. Malformed frames get an `error` event; the socket stays open.
pub async fn handle_message(state: &AppState, user_id: &str, text: &str) {
    let message = match ClientMessage::parse(text) {
        Ok(message) => message,
        Err(reason) => {
            debug!(user_id = %user_id, reason = %reason, "Rejected client message");
            return reply_error(state, user_id, &reason).await;
        }
    };

    match message {
        ClientMessage::Ping => presence::handle_ping(state, user_id).await,
        ClientMessage::GetOnlineStatus(payload) => {
            presence::handle_online_status(state, user_id, payload).await
        }
        ClientMessage::JoinRoom(payload) => rooms::handle_join_room(state, user_id, payload).await,
        ClientMessage::LeaveRoom(payload) => {
            rooms::handle_leave_room(state, user_id, payload).await
        }
        ClientMessage::ChallengeAccepted(payload) => {
            relay::handle_challenge_reply(state, user_id, payload, true).await
        }
        ClientMessage::ChallengeDeclined(payload) => {
            relay::handle_challenge_reply(state, user_id, payload, false).await
        }
        ClientMessage::ScoreUpdate(payload) => {
            relay::handle_score_update(state, user_id, payload).await
        }
        ClientMessage::Typing(payload) => relay::handle_typing(state, user_id, payload).await,
    }
}
