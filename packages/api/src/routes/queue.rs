use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::{debug, error};

use crate::{error::ApiError, middleware::auth::AuthenticatedUser, state::AppState};
use shared::models::queue::requests::JoinQueueRequest;
use shared::models::queue::responses::{
    JoinQueueResponse, LeaveQueueResponse, QueueStatusResponse,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/queue/join", post(join_queue))
        .route("/queue/leave", post(leave_queue))
        .route("/queue/status", get(queue_status))
}

async fn join_queue(
    State(state): State<AppState>,
    authenticated_user: AuthenticatedUser,
    payload: Option<Json<JoinQueueRequest>>,
) -> Result<Json<JoinQueueResponse>, ApiError> {
    let player_id = authenticated_user.user_id;
    let Json(payload) = payload.unwrap_or_default();

    let response = state
        .queue_service
        .join(&player_id, payload.mode)
        .await
        .map_err(|e| {
            error!("Failed to join queue for user {}: {}", player_id, e);
            ApiError::from(e)
        })?;

    debug!("User {} joined queue: {}", player_id, payload.mode);
    Ok(Json(response))
}

async fn leave_queue(
    State(state): State<AppState>,
    authenticated_user: AuthenticatedUser,
) -> Json<LeaveQueueResponse> {
    Json(state.queue_service.leave(&authenticated_user.user_id).await)
}

async fn queue_status(
    State(state): State<AppState>,
    authenticated_user: AuthenticatedUser,
) -> Json<QueueStatusResponse> {
    Json(state.queue_service.status(&authenticated_user.user_id).await)
}
