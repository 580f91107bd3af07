use std::sync::Arc;
use tracing::{info, warn};

use crate::models::match_session::GameMode;
use crate::models::matches::responses::PlayerSummary;
use crate::models::queue::responses::{
    JoinQueueResponse, LeaveQueueResponse, LeaveQueueStatus, QueueStatusResponse,
};
use crate::models::queue::QueueEntry;
use crate::repositories::profile_repository::ProfileRepository;
use crate::services::errors::queue_service_errors::QueueServiceError;
use crate::services::match_service::MatchService;
use crate::services::matchmaking_queue::{JoinOutcome, MatchmakingQueue};

/// Front door of the matchmaking pool: snapshots the caller's profile, pairs
/// through [`MatchmakingQueue`] and materializes pairings as matches.
pub struct QueueService {
    queue: Arc<MatchmakingQueue>,
    matches: Arc<MatchService>,
    profiles: Arc<dyn ProfileRepository>,
}

impl QueueService {
    pub fn new(
        queue: Arc<MatchmakingQueue>,
        matches: Arc<MatchService>,
        profiles: Arc<dyn ProfileRepository>,
    ) -> Self {
        QueueService {
            queue,
            matches,
            profiles,
        }
    }

    pub fn queue(&self) -> &Arc<MatchmakingQueue> {
        &self.queue
    }

    pub async fn join(&self, user_id: &str, mode: GameMode) -> Result<JoinQueueResponse, QueueServiceError> {
        if mode == GameMode::Staked {
            return Err(QueueServiceError::ValidationError(
                "staked matches are only available through challenges".to_string(),
            ));
        }
        if self.queue.status(user_id).await.is_some() {
            return Err(QueueServiceError::AlreadyQueued);
        }

        let profile = self.profiles.get_profile(user_id).await?;
        let entry = QueueEntry::new(&profile, mode);

        match self
            .queue
            .join(entry)
            .await
            .map_err(|_| QueueServiceError::AlreadyQueued)?
        {
            JoinOutcome::Queued {
                position,
                queue_size,
            } => {
                info!(user_id = %user_id, mode = %mode, position, "Joined matchmaking queue");
                Ok(JoinQueueResponse::Searching {
                    position,
                    queue_size,
                })
            }
            JoinOutcome::Paired {
                waiting,
                arriving,
                waiting_index,
            } => match self.matches.create_paired(&waiting, &arriving).await {
                Ok(session) => Ok(JoinQueueResponse::MatchFound {
                    match_id: session.id,
                    opponent: PlayerSummary::from(&waiting),
                }),
                Err(e) => {
                    warn!(waiting = %waiting.user_id, arriving = %arriving.user_id, error = %e, "Pairing failed, restoring waiting entry");
                    self.queue.restore(waiting, waiting_index).await;
                    Err(e.into())
                }
            },
        }
    }

    pub async fn leave(&self, user_id: &str) -> LeaveQueueResponse {
        let status = if self.queue.leave(user_id).await {
            info!(user_id = %user_id, "Left matchmaking queue");
            LeaveQueueStatus::Left
        } else {
            LeaveQueueStatus::NotInQueue
        };
        LeaveQueueResponse { status }
    }

    pub async fn status(&self, user_id: &str) -> QueueStatusResponse {
        let queue_size = self.queue.len().await;
        match self.queue.status(user_id).await {
            Some((position, entry)) => QueueStatusResponse {
                in_queue: true,
                position: Some(position),
                queue_size,
                mode: Some(entry.mode),
                joined_at: Some(entry.joined_at),
            },
            None => QueueStatusResponse {
                in_queue: false,
                position: None,
                queue_size,
                mode: None,
                joined_at: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::match_session::{MatchSession, MatchStatus};
    use crate::models::profile::Profile;
    use crate::repositories::errors::match_repository_errors::MatchRepositoryError;
    use crate::repositories::match_repository::{
        InMemoryMatchRepository, MatchRepository, MockMatchRepository,
    };
    use crate::repositories::profile_repository::InMemoryProfileRepository;
    use crate::services::errors::match_service_errors::MatchServiceError;
    use crate::services::event_dispatcher::Notifier;

    async fn profiles(users: &[&str]) -> Arc<InMemoryProfileRepository> {
        let repo = Arc::new(InMemoryProfileRepository::new());
        for user in users {
            repo.insert(Profile::new(user, Some(&format!("Player {}", user)))).await;
        }
        repo
    }

    fn service_with(
        matches: Arc<dyn MatchRepository>,
        profiles: Arc<InMemoryProfileRepository>,
    ) -> QueueService {
        let (notifier, _rx) = Notifier::channel();
        let match_service = Arc::new(MatchService::new(matches, profiles.clone(), notifier));
        QueueService::new(Arc::new(MatchmakingQueue::new()), match_service, profiles)
    }

    #[tokio::test]
    async fn test_two_ranked_players_are_paired_into_accepted_match() {
        let matches = Arc::new(InMemoryMatchRepository::new());
        let service = service_with(matches.clone(), profiles(&["1", "2"]).await);

        let first = service.join("1", GameMode::Ranked).await.unwrap();
        assert!(matches!(first, JoinQueueResponse::Searching { position: 1, queue_size: 1 }));

        let second = service.join("2", GameMode::Ranked).await.unwrap();
        let JoinQueueResponse::MatchFound { match_id, opponent } = second else {
            panic!("expected a pairing");
        };

        assert_eq!(opponent.id, "1");
        let session = matches.get_match(&match_id).await.unwrap();
        assert_eq!(session.status, MatchStatus::Accepted);
        assert_eq!((session.player1_id.as_str(), session.player2_id.as_str()), ("1", "2"));
        assert_eq!(service.status("1").await.queue_size, 0);
        assert!(!service.status("2").await.in_queue);
    }

    #[tokio::test]
    async fn test_join_twice_is_rejected() {
        let service = service_with(Arc::new(InMemoryMatchRepository::new()), profiles(&["1"]).await);
        service.join("1", GameMode::Friendly).await.unwrap();

        let err = service.join("1", GameMode::Ranked).await.unwrap_err();

        assert_eq!(err, QueueServiceError::AlreadyQueued);
    }

    #[tokio::test]
    async fn test_staked_mode_is_not_queueable() {
        let service = service_with(Arc::new(InMemoryMatchRepository::new()), profiles(&["1"]).await);

        let err = service.join("1", GameMode::Staked).await.unwrap_err();

        assert!(matches!(err, QueueServiceError::ValidationError(_)));
        assert!(service.queue().is_empty().await);
    }

    #[tokio::test]
    async fn test_unknown_profile_cannot_queue() {
        let service = service_with(Arc::new(InMemoryMatchRepository::new()), profiles(&[]).await);

        let err = service.join("ghost", GameMode::Ranked).await.unwrap_err();

        assert_eq!(err, QueueServiceError::ProfileNotFound("ghost".to_string()));
    }

    #[tokio::test]
    async fn test_failed_pairing_restores_waiting_player() {
        let mut matches = MockMatchRepository::new();
        matches
            .expect_find_active_between()
            .returning(|_, _| Ok(None));
        matches
            .expect_create_match()
            .returning(|_: &MatchSession| Err(MatchRepositoryError::DynamoDb("down".to_string())));
        let service = service_with(Arc::new(matches), profiles(&["1", "2"]).await);
        service.join("1", GameMode::Ranked).await.unwrap();

        let err = service.join("2", GameMode::Ranked).await.unwrap_err();

        assert!(matches!(
            err,
            QueueServiceError::MatchService(MatchServiceError::RepositoryError(_))
        ));
        let waiting = service.status("1").await;
        assert!(waiting.in_queue);
        assert_eq!(waiting.position, Some(1));
        assert!(!service.status("2").await.in_queue);
    }

    #[tokio::test]
    async fn test_pair_with_active_match_is_not_paired_again() {
        let matches = Arc::new(InMemoryMatchRepository::new());
        let service = service_with(matches.clone(), profiles(&["1", "2"]).await);
        service.join("1", GameMode::Ranked).await.unwrap();
        service.join("2", GameMode::Ranked).await.unwrap();

        service.join("1", GameMode::Ranked).await.unwrap();
        let err = service.join("2", GameMode::Ranked).await.unwrap_err();

        assert_eq!(
            err,
            QueueServiceError::MatchService(MatchServiceError::DuplicateActiveMatch)
        );
        let active = matches
            .list_for_player("1", &MatchStatus::ACTIVE)
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert!(service.status("1").await.in_queue);
        assert!(!service.status("2").await.in_queue);
    }

    #[tokio::test]
    async fn test_leave_and_status() {
        let service = service_with(Arc::new(InMemoryMatchRepository::new()), profiles(&["1", "2"]).await);
        service.join("1", GameMode::Ranked).await.unwrap();
        service.join("2", GameMode::Friendly).await.unwrap();

        let status = service.status("2").await;
        assert_eq!(status.position, Some(2));
        assert_eq!(status.mode, Some(GameMode::Friendly));

        assert_eq!(service.leave("1").await.status, LeaveQueueStatus::Left);
        assert_eq!(service.leave("1").await.status, LeaveQueueStatus::NotInQueue);
        assert_eq!(service.status("2").await.position, Some(1));
    }
}
