use chrono::Utc;
use tracing::debug;

use super::default::reply_error;
use crate::state::AppState;
use shared::models::events::{ChallengeReplyPayload, ScoreUpdatePayload, ServerEvent, TypingPayload};

/// Forwards a client-side accept/decline notice to the challenger. The match
/// itself only changes through the REST operations.
pub async fn handle_challenge_reply(
    state: &AppState,
    user_id: &str,
    payload: ChallengeReplyPayload,
    accepted: bool,
) {
    let opponent_name = match state.player_service.profile(user_id).await {
        Ok(profile) => profile.display_name(),
        Err(_) => "Player".to_string(),
    };
    let event = if accepted {
        ServerEvent::ChallengeAccepted {
            match_id: payload.match_id,
            opponent_id: user_id.to_string(),
            opponent_name,
        }
    } else {
        ServerEvent::ChallengeDeclined {
            match_id: payload.match_id,
            opponent_id: user_id.to_string(),
            opponent_name,
        }
    };
    if let Err(e) = state.registry.send(&payload.challenger_id, event).await {
        debug!(error = %e, "Challenge reply not relayed");
    }
}

/// Shares a live score with the rest of the match room.
pub async fn handle_score_update(state: &AppState, user_id: &str, payload: ScoreUpdatePayload) {
    let rooms = state.rooms.rooms_of(user_id).await;
    if !rooms.contains(&payload.match_id) {
        return reply_error(state, user_id, "Not in this match room").await;
    }

    state
        .rooms
        .send_to_room(
            &payload.match_id,
            ServerEvent::ScoreUpdated {
                match_id: payload.match_id.clone(),
                user_id: user_id.to_string(),
                my_score: payload.my_score,
                opponent_score: payload.opponent_score,
                timestamp: Utc::now(),
            },
            Some(user_id),
        )
        .await;
}

pub async fn handle_typing(state: &AppState, user_id: &str, payload: TypingPayload) {
    let event = ServerEvent::UserTyping {
        user_id: user_id.to_string(),
        is_typing: payload.is_typing,
    };
    if let Err(e) = state.registry.send(&payload.to_user_id, event).await {
        debug!(error = %e, "Typing indicator not delivered");
    }
}
