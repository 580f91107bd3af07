use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const STARTING_COINS: i64 = 100;
pub const STARTING_RATING: i32 = 1000;

/// Player profile as stored by the persistence collaborator.
/// The core only reads it and applies [`ProfileDelta`] batches to it.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Profile {
    pub user_id: String,
    pub nickname: Option<String>,
    pub avatar_url: Option<String>,
    pub level: u32,
    pub coins: i64,
    pub rating: i32,
    pub total_matches: u32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub last_online: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(user_id: &str, nickname: Option<&str>) -> Self {
        Profile {
            user_id: user_id.to_string(),
            nickname: nickname.map(str::to_string),
            avatar_url: None,
            level: 1,
            coins: STARTING_COINS,
            rating: STARTING_RATING,
            total_matches: 0,
            wins: 0,
            losses: 0,
            draws: 0,
            last_online: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_coins(mut self, coins: i64) -> Self {
        self.coins = coins;
        self
    }

    pub fn display_name(&self) -> String {
        self.nickname
            .clone()
            .unwrap_or_else(|| "Player".to_string())
    }

    /// Percentage of matches won, rounded to two decimals.
    pub fn win_rate(&self) -> f64 {
        if self.total_matches == 0 {
            return 0.0;
        }
        (self.wins as f64 / self.total_matches as f64 * 10_000.0).round() / 100.0
    }

    /// Applies a delta in place. Callers are expected to have checked funds.
    pub fn apply(&mut self, delta: &ProfileDelta) {
        self.coins += delta.coins;
        self.rating += delta.rating;
        self.total_matches = add_signed(self.total_matches, delta.total_matches);
        self.wins = add_signed(self.wins, delta.wins);
        self.losses = add_signed(self.losses, delta.losses);
        self.draws = add_signed(self.draws, delta.draws);
    }
}

fn add_signed(value: u32, delta: i32) -> u32 {
    (value as i64 + delta as i64).max(0) as u32
}

/// Increment applied to one profile as part of an all-or-nothing batch.
/// A negative `coins` value is only applied if the balance covers it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProfileDelta {
    pub user_id: String,
    pub coins: i64,
    pub rating: i32,
    pub total_matches: i32,
    pub wins: i32,
    pub losses: i32,
    pub draws: i32,
}

impl ProfileDelta {
    pub fn new(user_id: &str) -> Self {
        ProfileDelta {
            user_id: user_id.to_string(),
            ..Default::default()
        }
    }

    pub fn coins(user_id: &str, amount: i64) -> Self {
        ProfileDelta {
            coins: amount,
            ..ProfileDelta::new(user_id)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.coins == 0
            && self.rating == 0
            && self.total_matches == 0
            && self.wins == 0
            && self.losses == 0
            && self.draws == 0
    }

    /// The delta that undoes this one.
    pub fn inverse(&self) -> Self {
        ProfileDelta {
            user_id: self.user_id.clone(),
            coins: -self.coins,
            rating: -self.rating,
            total_matches: -self.total_matches,
            wins: -self.wins,
            losses: -self.losses,
            draws: -self.draws,
        }
    }

    /// Merges `other` into `self`; both must target the same profile.
    pub fn merge(mut self, other: &ProfileDelta) -> Self {
        debug_assert_eq!(self.user_id, other.user_id);
        self.coins += other.coins;
        self.rating += other.rating;
        self.total_matches += other.total_matches;
        self.wins += other.wins;
        self.losses += other.losses;
        self.draws += other.draws;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_profile_defaults() {
        let profile = Profile::new("user-1", Some("striker"));

        assert_eq!(profile.user_id, "user-1");
        assert_eq!(profile.coins, STARTING_COINS);
        assert_eq!(profile.rating, STARTING_RATING);
        assert_eq!(profile.level, 1);
        assert_eq!(profile.display_name(), "striker");
        assert!(profile.last_online.is_none());
    }

    #[test]
    fn test_display_name_falls_back() {
        let profile = Profile::new("user-1", None);
        assert_eq!(profile.display_name(), "Player");
    }

    #[test]
    fn test_win_rate() {
        let mut profile = Profile::new("user-1", None);
        assert_eq!(profile.win_rate(), 0.0);

        profile.total_matches = 3;
        profile.wins = 2;
        assert_eq!(profile.win_rate(), 66.67);
    }

    #[test]
    fn test_apply_and_inverse_cancel_out() {
        let original = Profile::new("user-1", None);
        let delta = ProfileDelta {
            coins: 100,
            rating: 25,
            total_matches: 1,
            wins: 1,
            ..ProfileDelta::new("user-1")
        };

        let mut profile = original.clone();
        profile.apply(&delta);
        assert_eq!(profile.coins, STARTING_COINS + 100);
        assert_eq!(profile.rating, STARTING_RATING + 25);
        assert_eq!(profile.wins, 1);

        profile.apply(&delta.inverse());
        assert_eq!(profile, original);
    }

    #[test]
    fn test_merge_and_is_empty() {
        let merged = ProfileDelta::coins("user-1", -50).merge(&ProfileDelta::coins("user-1", 50));
        assert!(merged.is_empty());
        assert!(!ProfileDelta::coins("user-1", 1).is_empty());
    }
}
