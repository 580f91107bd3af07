use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use tracing::debug;

use crate::{error::ApiError, middleware::auth::AuthenticatedUser, state::AppState};
use shared::models::match_session::MatchSession;
use shared::models::matches::requests::{ChallengeRequest, HistoryQuery, SubmitResultRequest};
use shared::models::matches::responses::{
    ActiveMatchesResponse, ChallengeResponse, HistoryResponse, PendingChallengesResponse,
    StatsResponse,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/matches/challenge", post(create_challenge))
        .route("/matches/pending", get(list_pending))
        .route("/matches/active", get(list_active))
        .route("/matches/history", get(history))
        .route("/matches/stats", get(stats))
        .route("/matches/{match_id}", get(get_match))
        .route("/matches/{match_id}/accept", post(accept))
        .route("/matches/{match_id}/decline", post(decline))
        .route("/matches/{match_id}/start", post(start))
        .route("/matches/{match_id}/result", post(submit_result))
}

async fn create_challenge(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<ChallengeRequest>,
) -> Result<Json<ChallengeResponse>, ApiError> {
    let response = state
        .match_service
        .challenge(
            &user.user_id,
            &payload.opponent_id,
            payload.mode,
            payload.bet_amount,
        )
        .await
        .map_err(|e| {
            debug!(user_id = %user.user_id, opponent = %payload.opponent_id, error = %e, "Challenge rejected");
            ApiError::from(e)
        })?;
    Ok(Json(response))
}

async fn accept(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(match_id): Path<String>,
) -> Result<Json<MatchSession>, ApiError> {
    Ok(Json(state.match_service.accept(&match_id, &user.user_id).await?))
}

async fn decline(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(match_id): Path<String>,
) -> Result<Json<MatchSession>, ApiError> {
    Ok(Json(state.match_service.decline(&match_id, &user.user_id).await?))
}

async fn start(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(match_id): Path<String>,
) -> Result<Json<MatchSession>, ApiError> {
    Ok(Json(state.match_service.start(&match_id, &user.user_id).await?))
}

async fn submit_result(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(match_id): Path<String>,
    Json(payload): Json<SubmitResultRequest>,
) -> Result<Json<MatchSession>, ApiError> {
    let session = state
        .match_service
        .submit_result(
            &match_id,
            &user.user_id,
            payload.my_score,
            payload.opponent_score,
            payload.screenshot_url,
        )
        .await?;
    Ok(Json(session))
}

async fn get_match(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(match_id): Path<String>,
) -> Result<Json<MatchSession>, ApiError> {
    Ok(Json(state.match_service.get(&match_id, &user.user_id).await?))
}

async fn list_pending(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<PendingChallengesResponse>, ApiError> {
    Ok(Json(state.match_service.list_pending(&user.user_id).await?))
}

async fn list_active(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ActiveMatchesResponse>, ApiError> {
    Ok(Json(state.match_service.list_active(&user.user_id).await?))
}

async fn history(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    Ok(Json(state.stats_service.history(&user.user_id, &query).await?))
}

async fn stats(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<StatsResponse>, ApiError> {
    Ok(Json(state.stats_service.stats(&user.user_id).await?))
}
