use chrono::Utc;
use std::collections::BTreeMap;

use super::default::reply;
use crate::state::AppState;
use shared::models::events::{OnlineStatusPayload, ServerEvent};

pub async fn handle_ping(state: &AppState, user_id: &str) {
    state.player_service.touch(user_id).await;
    reply(
        state,
        user_id,
        ServerEvent::Pong {
            timestamp: Utc::now(),
        },
    )
    .await;
}

pub async fn handle_online_status(state: &AppState, user_id: &str, payload: OnlineStatusPayload) {
    let mut statuses = BTreeMap::new();
    for id in payload.user_ids {
        let online = state.registry.is_online(&id).await;
        statuses.insert(id, online);
    }
    reply(state, user_id, ServerEvent::OnlineStatus(statuses)).await;
}
