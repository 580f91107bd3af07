use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use crate::{error::ApiError, middleware::auth::AuthenticatedUser, state::AppState};
use shared::models::matches::requests::OnlinePlayersQuery;
use shared::models::matches::responses::OnlinePlayersResponse;
use shared::models::profile::Profile;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/players/me", get(get_me))
        .route("/players/online", get(online_players))
}

async fn get_me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Profile>, ApiError> {
    Ok(Json(state.player_service.profile(&user.user_id).await?))
}

async fn online_players(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<OnlinePlayersQuery>,
) -> Result<Json<OnlinePlayersResponse>, ApiError> {
    let response = state
        .player_service
        .online_players(&user.user_id, query.limit)
        .await?;
    Ok(Json(response))
}
