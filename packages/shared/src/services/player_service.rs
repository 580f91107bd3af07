use chrono::Utc;
use std::sync::Arc;
use tracing::warn;

use crate::models::matches::responses::{OnlinePlayer, OnlinePlayersResponse};
use crate::models::profile::Profile;
use crate::repositories::match_repository::MatchRepository;
use crate::repositories::profile_repository::ProfileRepository;
use crate::services::connection_registry::ConnectionRegistry;
use crate::services::errors::match_service_errors::MatchServiceError;

pub const DEFAULT_ONLINE_LIMIT: usize = 20;
pub const MAX_ONLINE_LIMIT: usize = 50;

/// Presence-facing profile reads.
pub struct PlayerService {
    registry: Arc<ConnectionRegistry>,
    profiles: Arc<dyn ProfileRepository>,
    matches: Arc<dyn MatchRepository>,
}

impl PlayerService {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        profiles: Arc<dyn ProfileRepository>,
        matches: Arc<dyn MatchRepository>,
    ) -> Self {
        PlayerService {
            registry,
            profiles,
            matches,
        }
    }

    pub async fn profile(&self, user_id: &str) -> Result<Profile, MatchServiceError> {
        Ok(self.profiles.get_profile(user_id).await?)
    }

    /// Refreshes `last_online`. Failures are logged and swallowed.
    pub async fn touch(&self, user_id: &str) {
        if let Err(e) = self.profiles.touch_last_online(user_id, Utc::now()).await {
            warn!(user_id = %user_id, error = %e, "Failed to update last_online");
        }
    }

    /// Connected players other than the caller, with whether the caller
    /// already has an active match against each.
    pub async fn online_players(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<OnlinePlayersResponse, MatchServiceError> {
        let limit = limit.unwrap_or(DEFAULT_ONLINE_LIMIT);
        if !(1..=MAX_ONLINE_LIMIT).contains(&limit) {
            return Err(MatchServiceError::ValidationError(format!(
                "limit must be between 1 and {}",
                MAX_ONLINE_LIMIT
            )));
        }

        let others: Vec<String> = self
            .registry
            .online_users()
            .await
            .into_iter()
            .filter(|id| id != user_id)
            .collect();
        let total_online = others.len();
        let listed: Vec<String> = others.into_iter().take(limit).collect();

        let mut players = Vec::with_capacity(listed.len());
        for profile in self.profiles.get_profiles(&listed).await? {
            let has_active_match = self
                .matches
                .find_active_between(user_id, &profile.user_id)
                .await?
                .is_some();
            players.push(OnlinePlayer {
                nickname: profile.display_name(),
                win_rate: profile.win_rate(),
                id: profile.user_id,
                avatar_url: profile.avatar_url,
                level: profile.level,
                wins: profile.wins,
                total_matches: profile.total_matches,
                has_active_match,
                last_online: profile.last_online,
            });
        }

        Ok(OnlinePlayersResponse {
            count: players.len(),
            players,
            total_online,
        })
    }
}
