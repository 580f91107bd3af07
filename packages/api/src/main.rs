use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use arena_api::config::{ArenaConfig, StoreBackend};
use arena_api::{app, state::AppState};
use shared::repositories::match_repository::{
    DynamoDbMatchRepository, InMemoryMatchRepository, MatchRepository,
};
use shared::repositories::profile_repository::{
    DynamoDbProfileRepository, InMemoryProfileRepository, ProfileRepository,
};
use shared::services::auth_service::AuthService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ArenaConfig::from_env()?;

    let (matches, profiles): (Arc<dyn MatchRepository>, Arc<dyn ProfileRepository>) =
        match &config.store {
            StoreBackend::Memory => {
                info!("Using in-memory stores");
                (
                    Arc::new(InMemoryMatchRepository::new()),
                    Arc::new(InMemoryProfileRepository::new()),
                )
            }
            StoreBackend::DynamoDb {
                matches_table,
                profiles_table,
            } => {
                let aws_config = aws_config::load_from_env().await;
                let client = aws_sdk_dynamodb::Client::new(&aws_config);
                info!(matches_table = %matches_table, profiles_table = %profiles_table, "Using DynamoDB stores");
                (
                    Arc::new(DynamoDbMatchRepository::new(client.clone(), matches_table)),
                    Arc::new(DynamoDbProfileRepository::new(client, profiles_table)),
                )
            }
        };

    let state = AppState::new(
        AuthService::with_jwt_secret(config.jwt_secret.clone()),
        matches,
        profiles,
    );
    let _expiry = state.spawn_expiry(config.expiry);

    let listener = TcpListener::bind(config.bind_address).await?;
    info!(address = %config.bind_address, "Arena API listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}
