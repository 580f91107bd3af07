use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::models::profile::ProfileDelta;

/// Fixed rating step applied to ranked results.
pub const RANKED_RATING_DELTA: i32 = 25;
/// Highest score a single claim may report.
pub const MAX_CLAIMED_SCORE: u32 = 99;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    Ranked,
    Friendly,
    #[serde(alias = "challenge")]
    Staked,
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameMode::Ranked => write!(f, "ranked"),
            GameMode::Friendly => write!(f, "friendly"),
            GameMode::Staked => write!(f, "staked"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Pending,
    Accepted,
    Playing,
    ResultSubmitted,
    Completed,
    Cancelled,
    Disputed,
}

impl MatchStatus {
    /// Statuses that block a second challenge between the same pair.
    pub const ACTIVE: [MatchStatus; 3] = [
        MatchStatus::Pending,
        MatchStatus::Accepted,
        MatchStatus::Playing,
    ];

    /// Statuses in which results may still be submitted.
    pub const IN_PLAY: [MatchStatus; 3] = [
        MatchStatus::Accepted,
        MatchStatus::Playing,
        MatchStatus::ResultSubmitted,
    ];

    pub fn is_active(self) -> bool {
        Self::ACTIVE.contains(&self)
    }

    pub fn is_in_play(self) -> bool {
        Self::IN_PLAY.contains(&self)
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            MatchStatus::Completed | MatchStatus::Cancelled | MatchStatus::Disputed
        )
    }

    /// The transition table. Anything not listed here is rejected.
    pub fn can_transition_to(self, next: MatchStatus) -> bool {
        use MatchStatus::*;
        matches!(
            (self, next),
            (Pending, Accepted)
                | (Pending, Cancelled)
                | (Accepted, Playing)
                | (Accepted, ResultSubmitted)
                | (Accepted, Cancelled)
                | (Playing, ResultSubmitted)
                | (Playing, Cancelled)
                | (ResultSubmitted, ResultSubmitted)
                | (ResultSubmitted, Completed)
                | (ResultSubmitted, Disputed)
        )
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchStatus::Pending => "PENDING",
            MatchStatus::Accepted => "ACCEPTED",
            MatchStatus::Playing => "PLAYING",
            MatchStatus::ResultSubmitted => "RESULT_SUBMITTED",
            MatchStatus::Completed => "COMPLETED",
            MatchStatus::Cancelled => "CANCELLED",
            MatchStatus::Disputed => "DISPUTED",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: MatchStatus,
    pub to: MatchStatus,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot move match from {} to {}", self.from, self.to)
    }
}

impl std::error::Error for InvalidTransition {}

/// A submitted score pair stored in the canonical player1-player2 orientation,
/// so both players' claims compare directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ScoreClaim {
    pub player1: u32,
    pub player2: u32,
}

impl ScoreClaim {
    /// Normalizes a "mine-theirs" claim made by one of the two players.
    pub fn from_perspective(submitter_is_player1: bool, my_score: u32, opponent_score: u32) -> Self {
        if submitter_is_player1 {
            ScoreClaim {
                player1: my_score,
                player2: opponent_score,
            }
        } else {
            ScoreClaim {
                player1: opponent_score,
                player2: my_score,
            }
        }
    }
}

impl fmt::Display for ScoreClaim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.player1, self.player2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EscrowStatus {
    Held,
    Released,
    Refunded,
}

/// Coins held for a staked match. Resolved exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EscrowEntry {
    pub player1_held: i64,
    pub player2_held: i64,
    pub status: EscrowStatus,
}

impl EscrowEntry {
    pub fn held(stake: i64) -> Self {
        EscrowEntry {
            player1_held: stake,
            player2_held: stake,
            status: EscrowStatus::Held,
        }
    }

    pub fn total(&self) -> i64 {
        self.player1_held + self.player2_held
    }

    pub fn is_held(&self) -> bool {
        self.status == EscrowStatus::Held
    }
}

/// The reconciled result of a match whose two claims agreed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    pub player1_score: u32,
    pub player2_score: u32,
    pub winner_id: Option<String>,
    pub player1_rating_change: i32,
    pub player2_rating_change: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// Only one side has submitted so far.
    AwaitingOpponent,
    Agreed(MatchOutcome),
    Disputed { reason: String },
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MatchSession {
    pub id: String,
    pub player1_id: String,
    pub player2_id: String,
    pub mode: GameMode,
    pub status: MatchStatus,
    pub bet_amount: i64,
    pub player1_claim: Option<ScoreClaim>,
    pub player2_claim: Option<ScoreClaim>,
    pub player1_screenshot: Option<String>,
    pub player2_screenshot: Option<String>,
    pub player1_score: Option<u32>,
    pub player2_score: Option<u32>,
    pub winner_id: Option<String>,
    pub player1_rating_change: Option<i32>,
    pub player2_rating_change: Option<i32>,
    pub escrow: Option<EscrowEntry>,
    pub dispute_reason: Option<String>,
    pub cancel_reason: Option<String>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub result_submitted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub disputed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl MatchSession {
    /// A challenge issued by `challenger_id`, waiting for `opponent_id` to respond.
    pub fn challenge(challenger_id: &str, opponent_id: &str, mode: GameMode, bet_amount: i64) -> Self {
        MatchSession {
            id: Uuid::new_v4().to_string(),
            player1_id: challenger_id.to_string(),
            player2_id: opponent_id.to_string(),
            mode,
            status: MatchStatus::Pending,
            bet_amount,
            player1_claim: None,
            player2_claim: None,
            player1_screenshot: None,
            player2_screenshot: None,
            player1_score: None,
            player2_score: None,
            winner_id: None,
            player1_rating_change: None,
            player2_rating_change: None,
            escrow: None,
            dispute_reason: None,
            cancel_reason: None,
            version: 0,
            created_at: Utc::now(),
            accepted_at: None,
            started_at: None,
            result_submitted_at: None,
            completed_at: None,
            disputed_at: None,
            cancelled_at: None,
        }
    }

    /// A pairing produced by the matchmaking queue: already accepted, no stake.
    pub fn paired(waiting_id: &str, arriving_id: &str, mode: GameMode) -> Self {
        let mut session = MatchSession::challenge(waiting_id, arriving_id, mode, 0);
        session.status = MatchStatus::Accepted;
        session.accepted_at = Some(session.created_at);
        session
    }

    /// Room used for real-time events about this match.
    pub fn room_id(&self) -> &str {
        &self.id
    }

    pub fn is_participant(&self, user_id: &str) -> bool {
        self.player1_id == user_id || self.player2_id == user_id
    }

    pub fn is_player1(&self, user_id: &str) -> bool {
        self.player1_id == user_id
    }

    pub fn opponent_of(&self, user_id: &str) -> Option<&str> {
        if self.player1_id == user_id {
            Some(&self.player2_id)
        } else if self.player2_id == user_id {
            Some(&self.player1_id)
        } else {
            None
        }
    }

    pub fn involves_pair(&self, a: &str, b: &str) -> bool {
        (self.player1_id == a && self.player2_id == b) || (self.player1_id == b && self.player2_id == a)
    }

    pub fn has_submitted(&self, user_id: &str) -> bool {
        if self.is_player1(user_id) {
            self.player1_claim.is_some()
        } else if self.player2_id == user_id {
            self.player2_claim.is_some()
        } else {
            false
        }
    }

    pub fn rating_change_for(&self, user_id: &str) -> Option<i32> {
        if self.is_player1(user_id) {
            self.player1_rating_change
        } else {
            self.player2_rating_change
        }
    }

    /// Score from the viewer's side, "mine-theirs", or "-" before reconciliation.
    pub fn score_for(&self, user_id: &str) -> String {
        match (self.player1_score, self.player2_score) {
            (Some(p1), Some(p2)) if self.is_player1(user_id) => format!("{}-{}", p1, p2),
            (Some(p1), Some(p2)) => format!("{}-{}", p2, p1),
            _ => "-".to_string(),
        }
    }

    /// Moves along the transition table and stamps the matching timestamp.
    pub fn transition(&mut self, next: MatchStatus, at: DateTime<Utc>) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        match next {
            MatchStatus::Accepted => self.accepted_at = Some(at),
            MatchStatus::Playing => self.started_at = Some(at),
            MatchStatus::ResultSubmitted => self.result_submitted_at = Some(at),
            MatchStatus::Completed => self.completed_at = Some(at),
            MatchStatus::Disputed => self.disputed_at = Some(at),
            MatchStatus::Cancelled => self.cancelled_at = Some(at),
            MatchStatus::Pending => {}
        }
        self.status = next;
        Ok(())
    }

    /// Stores the submitter's claim in canonical orientation. A player may
    /// overwrite their own claim until the opponent has submitted too.
    pub fn record_claim(
        &mut self,
        submitter_id: &str,
        my_score: u32,
        opponent_score: u32,
        screenshot_url: Option<String>,
    ) {
        let is_player1 = self.is_player1(submitter_id);
        let claim = ScoreClaim::from_perspective(is_player1, my_score, opponent_score);
        if is_player1 {
            self.player1_claim = Some(claim);
            if screenshot_url.is_some() {
                self.player1_screenshot = screenshot_url;
            }
        } else {
            self.player2_claim = Some(claim);
            if screenshot_url.is_some() {
                self.player2_screenshot = screenshot_url;
            }
        }
    }

    /// Compares both claims. Pure: the caller applies the outcome.
    pub fn reconcile(&self) -> Reconciliation {
        let (claim1, claim2) = match (self.player1_claim, self.player2_claim) {
            (Some(c1), Some(c2)) => (c1, c2),
            _ => return Reconciliation::AwaitingOpponent,
        };
        if claim1 != claim2 {
            return Reconciliation::Disputed {
                reason: format!(
                    "claims do not match: player1 reported {}, player2 reported {}",
                    claim1, claim2
                ),
            };
        }

        let winner_id = if claim1.player1 > claim1.player2 {
            Some(self.player1_id.clone())
        } else if claim1.player2 > claim1.player1 {
            Some(self.player2_id.clone())
        } else {
            None
        };

        let (player1_rating_change, player2_rating_change) = match (&self.mode, &winner_id) {
            (GameMode::Ranked, Some(winner)) if *winner == self.player1_id => {
                (RANKED_RATING_DELTA, -RANKED_RATING_DELTA)
            }
            (GameMode::Ranked, Some(_)) => (-RANKED_RATING_DELTA, RANKED_RATING_DELTA),
            _ => (0, 0),
        };

        Reconciliation::Agreed(MatchOutcome {
            player1_score: claim1.player1,
            player2_score: claim1.player2,
            winner_id,
            player1_rating_change,
            player2_rating_change,
        })
    }

    /// Writes a reconciled outcome onto the session (status is moved separately).
    pub fn apply_outcome(&mut self, outcome: &MatchOutcome) {
        self.player1_score = Some(outcome.player1_score);
        self.player2_score = Some(outcome.player2_score);
        self.winner_id = outcome.winner_id.clone();
        self.player1_rating_change = Some(outcome.player1_rating_change);
        self.player2_rating_change = Some(outcome.player2_rating_change);
    }
}

impl MatchOutcome {
    /// Rating and win/loss/draw counter changes for both players, excluding coins.
    pub fn profile_deltas(&self, session: &MatchSession) -> [ProfileDelta; 2] {
        let delta_for = |user_id: &str, rating: i32| {
            let mut delta = ProfileDelta::new(user_id);
            delta.rating = rating;
            delta.total_matches = 1;
            match &self.winner_id {
                None => delta.draws = 1,
                Some(winner) if winner == user_id => delta.wins = 1,
                Some(_) => delta.losses = 1,
            }
            delta
        };
        [
            delta_for(&session.player1_id, self.player1_rating_change),
            delta_for(&session.player2_id, self.player2_rating_change),
        ]
    }
}
