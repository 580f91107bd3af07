use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::models::events::ServerEvent;
use crate::services::event_dispatcher::Notifier;
use crate::services::match_service::MatchService;
use crate::services::matchmaking_queue::MatchmakingQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    pub pending_challenge_ttl: Duration,
    pub queue_entry_ttl: Duration,
    pub abandoned_match_ttl: Duration,
    pub sweep_interval: std::time::Duration,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        ExpiryPolicy {
            pending_challenge_ttl: Duration::minutes(10),
            queue_entry_ttl: Duration::minutes(5),
            abandoned_match_ttl: Duration::hours(2),
            sweep_interval: std::time::Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpiryReport {
    pub pending_cancelled: usize,
    pub abandoned_cancelled: usize,
    pub queue_entries_dropped: usize,
}

impl ExpiryReport {
    pub fn is_empty(&self) -> bool {
        *self == ExpiryReport::default()
    }
}

/// Periodically cancels stale challenges and abandoned matches and drops
/// queue entries nobody paired with.
pub struct ExpiryService {
    policy: ExpiryPolicy,
    matches: Arc<MatchService>,
    queue: Arc<MatchmakingQueue>,
    notifier: Notifier,
}

impl ExpiryService {
    pub fn new(
        policy: ExpiryPolicy,
        matches: Arc<MatchService>,
        queue: Arc<MatchmakingQueue>,
        notifier: Notifier,
    ) -> Self {
        ExpiryService {
            policy,
            matches,
            queue,
            notifier,
        }
    }

    /// One sweep as of `now`. A failing step is logged and the others still run.
    pub async fn run_once(&self, now: DateTime<Utc>) -> ExpiryReport {
        let mut report = ExpiryReport::default();

        for entry in self.queue.expire(now - self.policy.queue_entry_ttl).await {
            warn!(user_id = %entry.user_id, mode = %entry.mode, "Queue entry expired");
            self.notifier
                .to_user(&entry.user_id, ServerEvent::QueueExpired { mode: entry.mode });
            report.queue_entries_dropped += 1;
        }

        match self
            .matches
            .expire_pending(now - self.policy.pending_challenge_ttl)
            .await
        {
            Ok(count) => report.pending_cancelled = count,
            Err(e) => error!(error = %e, "Pending challenge sweep failed"),
        }

        match self
            .matches
            .expire_abandoned(now - self.policy.abandoned_match_ttl)
            .await
        {
            Ok(count) => report.abandoned_cancelled = count,
            Err(e) => error!(error = %e, "Abandoned match sweep failed"),
        }

        report
    }

    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.policy.sweep_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let report = self.run_once(Utc::now()).await;
                if report.is_empty() {
                    debug!("Expiry sweep found nothing");
                } else {
                    info!(
                        pending = report.pending_cancelled,
                        abandoned = report.abandoned_cancelled,
                        queue = report.queue_entries_dropped,
                        "Expiry sweep"
                    );
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::match_session::{GameMode, MatchStatus};
    use crate::models::profile::Profile;
    use crate::models::queue::QueueEntry;
    use crate::repositories::match_repository::{InMemoryMatchRepository, MatchRepository};
    use crate::repositories::profile_repository::InMemoryProfileRepository;
    use crate::services::event_dispatcher::Dispatch;
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Fixture {
        expiry: ExpiryService,
        matches: Arc<MatchService>,
        store: Arc<InMemoryMatchRepository>,
        queue: Arc<MatchmakingQueue>,
        dispatched: UnboundedReceiver<Dispatch>,
    }

    async fn fixture() -> Fixture {
        let profiles = Arc::new(InMemoryProfileRepository::new());
        for user in ["a", "b", "c"] {
            profiles.insert(Profile::new(user, None)).await;
        }
        let store = Arc::new(InMemoryMatchRepository::new());
        let (notifier, dispatched) = Notifier::channel();
        let matches = Arc::new(MatchService::new(store.clone(), profiles, notifier.clone()));
        let queue = Arc::new(MatchmakingQueue::new());
        let expiry = ExpiryService::new(ExpiryPolicy::default(), matches.clone(), queue.clone(), notifier);
        Fixture {
            expiry,
            matches,
            store,
            queue,
            dispatched,
        }
    }

    #[tokio::test]
    async fn test_fresh_state_is_left_alone() {
        let f = fixture().await;
        f.matches.challenge("a", "b", GameMode::Ranked, 0).await.unwrap();
        f.queue
            .join(QueueEntry::new(&Profile::new("c", None), GameMode::Ranked))
            .await
            .unwrap();

        let report = f.expiry.run_once(Utc::now()).await;

        assert!(report.is_empty());
        assert_eq!(f.queue.len().await, 1);
    }

    #[tokio::test]
    async fn test_sweep_expires_everything_past_its_ttl() {
        let mut f = fixture().await;
        let pending = f.matches.challenge("a", "b", GameMode::Ranked, 0).await.unwrap();
        f.queue
            .join(QueueEntry::new(&Profile::new("c", None), GameMode::Friendly))
            .await
            .unwrap();
        while f.dispatched.try_recv().is_ok() {}

        let report = f.expiry.run_once(Utc::now() + Duration::hours(3)).await;

        assert_eq!(
            report,
            ExpiryReport {
                pending_cancelled: 1,
                abandoned_cancelled: 0,
                queue_entries_dropped: 1,
            }
        );
        assert_eq!(
            f.store.get_match(&pending.match_id).await.unwrap().status,
            MatchStatus::Cancelled
        );
        assert!(f.queue.is_empty().await);
        let mut queue_expired_for = Vec::new();
        while let Ok(dispatch) = f.dispatched.try_recv() {
            if let Dispatch::User {
                user_id,
                event: ServerEvent::QueueExpired { .. },
            } = dispatch
            {
                queue_expired_for.push(user_id);
            }
        }
        assert_eq!(queue_expired_for, vec!["c"]);
    }

    #[tokio::test]
    async fn test_abandoned_match_expires_after_its_own_ttl() {
        let f = fixture().await;
        let created = f.matches.challenge("a", "b", GameMode::Ranked, 0).await.unwrap();
        f.matches.accept(&created.match_id, "b").await.unwrap();

        let early = f.expiry.run_once(Utc::now() + Duration::minutes(30)).await;
        let late = f.expiry.run_once(Utc::now() + Duration::hours(3)).await;

        assert_eq!(early.abandoned_cancelled, 0);
        assert_eq!(late.abandoned_cancelled, 1);
    }
}
