pub mod requests;
pub mod responses;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::match_session::GameMode;
use crate::models::profile::Profile;

/// A player waiting in the matchmaking queue, with the profile details shown
/// to whoever gets paired with them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct QueueEntry {
    pub user_id: String,
    pub nickname: String,
    pub avatar_url: Option<String>,
    pub level: u32,
    pub rating: i32,
    pub wins: u32,
    pub total_matches: u32,
    pub mode: GameMode,
    pub joined_at: DateTime<Utc>,
}

impl QueueEntry {
    pub fn new(profile: &Profile, mode: GameMode) -> Self {
        QueueEntry {
            user_id: profile.user_id.clone(),
            nickname: profile.display_name(),
            avatar_url: profile.avatar_url.clone(),
            level: profile.level,
            rating: profile.rating,
            wins: profile.wins,
            total_matches: profile.total_matches,
            mode,
            joined_at: Utc::now(),
        }
    }
}
