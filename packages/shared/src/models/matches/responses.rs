use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::match_session::{GameMode, MatchStatus};
use crate::models::profile::Profile;
use crate::models::queue::QueueEntry;

/// Public view of another player, embedded in match and queue responses.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PlayerSummary {
    pub id: String,
    pub nickname: String,
    pub avatar_url: Option<String>,
    pub level: u32,
    pub rating: i32,
    pub wins: u32,
    pub total_matches: u32,
}

impl PlayerSummary {
    /// Placeholder for a player whose profile could not be read.
    pub fn unknown(user_id: &str) -> Self {
        PlayerSummary {
            id: user_id.to_string(),
            nickname: "Player".to_string(),
            avatar_url: None,
            level: 1,
            rating: 0,
            wins: 0,
            total_matches: 0,
        }
    }
}

impl From<&Profile> for PlayerSummary {
    fn from(profile: &Profile) -> Self {
        PlayerSummary {
            id: profile.user_id.clone(),
            nickname: profile.display_name(),
            avatar_url: profile.avatar_url.clone(),
            level: profile.level,
            rating: profile.rating,
            wins: profile.wins,
            total_matches: profile.total_matches,
        }
    }
}

impl From<&QueueEntry> for PlayerSummary {
    fn from(entry: &QueueEntry) -> Self {
        PlayerSummary {
            id: entry.user_id.clone(),
            nickname: entry.nickname.clone(),
            avatar_url: entry.avatar_url.clone(),
            level: entry.level,
            rating: entry.rating,
            wins: entry.wins,
            total_matches: entry.total_matches,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChallengeResponse {
    pub match_id: String,
    pub opponent: PlayerSummary,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PendingChallenge {
    pub id: String,
    pub mode: GameMode,
    pub bet_amount: i64,
    pub challenger: PlayerSummary,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PendingChallengesResponse {
    pub challenges: Vec<PendingChallenge>,
    pub count: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActiveMatch {
    pub id: String,
    pub mode: GameMode,
    pub status: MatchStatus,
    pub bet_amount: i64,
    pub opponent: PlayerSummary,
    pub has_submitted_result: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActiveMatchesResponse {
    pub matches: Vec<ActiveMatch>,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchResult {
    Win,
    Loss,
    Draw,
}

impl MatchResult {
    pub fn form_letter(self) -> &'static str {
        match self {
            MatchResult::Win => "W",
            MatchResult::Loss => "L",
            MatchResult::Draw => "D",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HistoryItem {
    pub id: String,
    pub mode: GameMode,
    pub status: MatchStatus,
    pub opponent: PlayerSummary,
    pub score: String,
    pub result: MatchResult,
    pub rating_change: i32,
    pub played_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HistoryResponse {
    pub matches: Vec<HistoryItem>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PlayerStats {
    pub total_matches: u32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub win_rate: f64,
    pub goals_scored: u32,
    pub goals_conceded: u32,
    pub avg_goals_per_match: f64,
    pub clean_sheets: u32,
    /// Positive for a run of wins, negative for a run of losses.
    pub current_streak: i32,
    pub longest_win_streak: u32,
    pub longest_loss_streak: u32,
    pub ranked_matches: u32,
    pub ranked_wins: u32,
    pub ranked_rating: i32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatsResponse {
    pub overview: PlayerStats,
    pub recent_form: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OnlinePlayer {
    pub id: String,
    pub nickname: String,
    pub avatar_url: Option<String>,
    pub level: u32,
    pub wins: u32,
    pub total_matches: u32,
    pub win_rate: f64,
    pub has_active_match: bool,
    pub last_online: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OnlinePlayersResponse {
    pub players: Vec<OnlinePlayer>,
    pub count: usize,
    pub total_online: usize,
}
