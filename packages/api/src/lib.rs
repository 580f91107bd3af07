use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod actions;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

use state::AppState;

pub fn app(state: AppState) -> Router {
    // TODO: restrict origins once the mobile client's web views are known
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .merge(routes::matches::routes())
        .merge(routes::queue::routes())
        .merge(routes::players::routes())
        .merge(routes::websocket::routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
