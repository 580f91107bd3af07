use std::sync::Arc;
use tokio::task::JoinHandle;

use shared::repositories::match_repository::MatchRepository;
use shared::repositories::profile_repository::ProfileRepository;
use shared::services::auth_service::AuthService;
use shared::services::connection_registry::ConnectionRegistry;
use shared::services::event_dispatcher::{spawn_dispatcher, Notifier};
use shared::services::expiry_service::{ExpiryPolicy, ExpiryService};
use shared::services::match_service::MatchService;
use shared::services::matchmaking_queue::MatchmakingQueue;
use shared::services::player_service::PlayerService;
use shared::services::queue_service::QueueService;
use shared::services::room_broadcaster::RoomBroadcaster;
use shared::services::stats_service::StatsService;

#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub registry: Arc<ConnectionRegistry>,
    pub rooms: RoomBroadcaster,
    pub notifier: Notifier,
    pub match_service: Arc<MatchService>,
    pub queue_service: Arc<QueueService>,
    pub stats_service: Arc<StatsService>,
    pub player_service: Arc<PlayerService>,
}

impl AppState {
    /// Wires every service over the given stores and starts the event
    /// dispatcher. Must be called inside a tokio runtime.
    pub fn new(
        auth_service: AuthService,
        matches: Arc<dyn MatchRepository>,
        profiles: Arc<dyn ProfileRepository>,
    ) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let rooms = RoomBroadcaster::new(registry.clone());
        let (notifier, _dispatcher) = spawn_dispatcher(rooms.clone());

        let match_service = Arc::new(MatchService::new(
            matches.clone(),
            profiles.clone(),
            notifier.clone(),
        ));
        let queue_service = Arc::new(QueueService::new(
            Arc::new(MatchmakingQueue::new()),
            match_service.clone(),
            profiles.clone(),
        ));
        let stats_service = Arc::new(StatsService::new(matches.clone(), profiles.clone()));
        let player_service = Arc::new(PlayerService::new(registry.clone(), profiles, matches));

        AppState {
            auth_service: Arc::new(auth_service),
            registry,
            rooms,
            notifier,
            match_service,
            queue_service,
            stats_service,
            player_service,
        }
    }

    pub fn spawn_expiry(&self, policy: ExpiryPolicy) -> JoinHandle<()> {
        Arc::new(ExpiryService::new(
            policy,
            self.match_service.clone(),
            self.queue_service.queue().clone(),
            self.notifier.clone(),
        ))
        .spawn()
    }
}
