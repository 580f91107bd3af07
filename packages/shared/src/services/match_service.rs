use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::models::events::ServerEvent;
use crate::models::match_session::{
    GameMode, MatchSession, MatchStatus, Reconciliation, MAX_CLAIMED_SCORE,
};
use crate::models::matches::responses::{
    ActiveMatch, ActiveMatchesResponse, ChallengeResponse, PendingChallenge,
    PendingChallengesResponse, PlayerSummary,
};
use crate::models::queue::QueueEntry;
use crate::repositories::errors::profile_repository_errors::ProfileRepositoryError;
use crate::repositories::match_repository::MatchRepository;
use crate::repositories::profile_repository::ProfileRepository;
use crate::services::errors::match_service_errors::MatchServiceError;
use crate::services::escrow_ledger::EscrowLedger;
use crate::services::event_dispatcher::Notifier;
use crate::services::keyed_locks::KeyedLocks;

const MAX_SCREENSHOT_URL_LEN: usize = 500;

fn pair_key(a: &str, b: &str) -> String {
    if a < b {
        format!("pair:{}:{}", a, b)
    } else {
        format!("pair:{}:{}", b, a)
    }
}

fn match_key(match_id: &str) -> String {
    format!("match:{}", match_id)
}

/// Authoritative lifecycle of head-to-head matches. Every mutation of one
/// match runs under that match's lock, from the read through the durable write.
pub struct MatchService {
    matches: Arc<dyn MatchRepository>,
    profiles: Arc<dyn ProfileRepository>,
    ledger: EscrowLedger,
    locks: KeyedLocks,
    notifier: Notifier,
}

impl MatchService {
    pub fn new(
        matches: Arc<dyn MatchRepository>,
        profiles: Arc<dyn ProfileRepository>,
        notifier: Notifier,
    ) -> Self {
        MatchService {
            ledger: EscrowLedger::new(profiles.clone()),
            matches,
            profiles,
            locks: KeyedLocks::new(),
            notifier,
        }
    }

    async fn summary(&self, user_id: &str) -> PlayerSummary {
        match self.profiles.get_profile(user_id).await {
            Ok(profile) => PlayerSummary::from(&profile),
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Profile unavailable for summary");
                PlayerSummary::unknown(user_id)
            }
        }
    }

    async fn load(&self, match_id: &str) -> Result<MatchSession, MatchServiceError> {
        Ok(self.matches.get_match(match_id).await?)
    }

    /// Stores `session` over the version it was read at.
    async fn persist(&self, session: &mut MatchSession) -> Result<(), MatchServiceError> {
        let expected = session.version;
        session.version += 1;
        if let Err(e) = self.matches.update_match(session, expected).await {
            session.version = expected;
            error!(match_id = %session.id, error = %e, "Failed to store match");
            return Err(e.into());
        }
        Ok(())
    }

    pub async fn challenge(
        &self,
        challenger_id: &str,
        opponent_id: &str,
        mode: GameMode,
        bet_amount: i64,
    ) -> Result<ChallengeResponse, MatchServiceError> {
        if challenger_id == opponent_id {
            return Err(MatchServiceError::SelfChallenge);
        }
        if bet_amount < 0 {
            return Err(MatchServiceError::ValidationError(
                "bet_amount cannot be negative".to_string(),
            ));
        }
        if mode == GameMode::Staked && bet_amount == 0 {
            return Err(MatchServiceError::ValidationError(
                "staked matches need a positive bet_amount".to_string(),
            ));
        }

        let opponent = match self.profiles.get_profile(opponent_id).await {
            Ok(profile) => profile,
            Err(ProfileRepositoryError::NotFound(_)) => return Err(MatchServiceError::OpponentNotFound),
            Err(e) => return Err(e.into()),
        };
        let challenger = self.profiles.get_profile(challenger_id).await?;

        let _pair = self.locks.lock(&pair_key(challenger_id, opponent_id)).await;
        if self
            .matches
            .find_active_between(challenger_id, opponent_id)
            .await?
            .is_some()
        {
            return Err(MatchServiceError::DuplicateActiveMatch);
        }
        if bet_amount > 0 && challenger.coins < bet_amount {
            return Err(MatchServiceError::InsufficientFunds(challenger_id.to_string()));
        }

        let session = MatchSession::challenge(challenger_id, opponent_id, mode, bet_amount);
        self.matches.create_match(&session).await?;
        info!(match_id = %session.id, challenger = %challenger_id, opponent = %opponent_id, mode = %mode, bet_amount, "Challenge created");

        self.notifier.to_user(
            opponent_id,
            ServerEvent::NewChallenge {
                match_id: session.id.clone(),
                challenger: PlayerSummary::from(&challenger),
                mode,
                bet_amount,
            },
        );

        Ok(ChallengeResponse {
            match_id: session.id,
            opponent: PlayerSummary::from(&opponent),
        })
    }

    pub async fn accept(&self, match_id: &str, responder_id: &str) -> Result<MatchSession, MatchServiceError> {
        let _guard = self.locks.lock(&match_key(match_id)).await;
        let mut session = self.load(match_id).await?;

        if session.player2_id != responder_id {
            return Err(MatchServiceError::Forbidden(
                "only the challenged player can accept".to_string(),
            ));
        }
        if session.status != MatchStatus::Pending {
            return Err(MatchServiceError::InvalidState(session.status));
        }

        let escrow = self.ledger.hold(&session).await?;
        session.escrow = escrow.clone();
        session.transition(MatchStatus::Accepted, Utc::now())?;
        if let Err(e) = self.persist(&mut session).await {
            if let Some(entry) = &escrow {
                self.ledger.cancel_hold(&session, entry).await;
            }
            return Err(e);
        }
        info!(match_id = %session.id, "Challenge accepted");

        self.notifier.join_room(&session.player1_id, session.room_id());
        self.notifier.join_room(&session.player2_id, session.room_id());
        let responder = self.summary(responder_id).await;
        self.notifier.to_user(
            &session.player1_id,
            ServerEvent::ChallengeAccepted {
                match_id: session.id.clone(),
                opponent_id: responder.id,
                opponent_name: responder.nickname,
            },
        );
        Ok(session)
    }

    pub async fn decline(&self, match_id: &str, responder_id: &str) -> Result<MatchSession, MatchServiceError> {
        let _guard = self.locks.lock(&match_key(match_id)).await;
        let mut session = self.load(match_id).await?;

        if session.player2_id != responder_id {
            return Err(MatchServiceError::Forbidden(
                "only the challenged player can decline".to_string(),
            ));
        }
        if session.status != MatchStatus::Pending {
            return Err(MatchServiceError::InvalidState(session.status));
        }

        session.transition(MatchStatus::Cancelled, Utc::now())?;
        session.cancel_reason = Some("declined".to_string());
        self.persist(&mut session).await?;
        info!(match_id = %session.id, "Challenge declined");

        let responder = self.summary(responder_id).await;
        self.notifier.to_user(
            &session.player1_id,
            ServerEvent::ChallengeDeclined {
                match_id: session.id.clone(),
                opponent_id: responder.id,
                opponent_name: responder.nickname,
            },
        );
        Ok(session)
    }

    /// Marks an accepted match as being played.
    pub async fn start(&self, match_id: &str, player_id: &str) -> Result<MatchSession, MatchServiceError> {
        let _guard = self.locks.lock(&match_key(match_id)).await;
        let mut session = self.load(match_id).await?;

        if !session.is_participant(player_id) {
            return Err(MatchServiceError::Forbidden(
                "you are not playing in this match".to_string(),
            ));
        }
        if session.status != MatchStatus::Accepted {
            return Err(MatchServiceError::InvalidState(session.status));
        }

        session.transition(MatchStatus::Playing, Utc::now())?;
        self.persist(&mut session).await?;
        info!(match_id = %session.id, "Match started");

        self.notifier.to_room(
            session.room_id(),
            ServerEvent::MatchStarted(Box::new(session.clone())),
            None,
        );
        Ok(session)
    }

    /// Records one player's claim and, once both are in, reconciles them.
    pub async fn submit_result(
        &self,
        match_id: &str,
        submitter_id: &str,
        my_score: u32,
        opponent_score: u32,
        screenshot_url: Option<String>,
    ) -> Result<MatchSession, MatchServiceError> {
        if my_score > MAX_CLAIMED_SCORE || opponent_score > MAX_CLAIMED_SCORE {
            return Err(MatchServiceError::ValidationError(format!(
                "scores must be between 0 and {}",
                MAX_CLAIMED_SCORE
            )));
        }
        if screenshot_url
            .as_ref()
            .map(|url| url.len() > MAX_SCREENSHOT_URL_LEN)
            .unwrap_or(false)
        {
            return Err(MatchServiceError::ValidationError(format!(
                "screenshot_url is longer than {} characters",
                MAX_SCREENSHOT_URL_LEN
            )));
        }

        let _guard = self.locks.lock(&match_key(match_id)).await;
        let mut session = self.load(match_id).await?;

        if !session.is_participant(submitter_id) {
            return Err(MatchServiceError::Forbidden(
                "you are not playing in this match".to_string(),
            ));
        }
        if !session.status.is_in_play() {
            return Err(MatchServiceError::InvalidState(session.status));
        }

        let now = Utc::now();
        session.record_claim(submitter_id, my_score, opponent_score, screenshot_url);
        session.transition(MatchStatus::ResultSubmitted, now)?;

        match session.reconcile() {
            Reconciliation::AwaitingOpponent => {
                self.persist(&mut session).await?;
                info!(match_id = %session.id, submitter = %submitter_id, "Result submitted");
                self.notifier.to_room(
                    session.room_id(),
                    ServerEvent::ResultSubmitted(Box::new(session.clone())),
                    None,
                );
            }
            Reconciliation::Disputed { reason } => {
                session.transition(MatchStatus::Disputed, now)?;
                session.dispute_reason = Some(reason);
                self.persist(&mut session).await?;
                warn!(match_id = %session.id, reason = ?session.dispute_reason, "Match disputed");
                self.notifier.to_room(
                    session.room_id(),
                    ServerEvent::MatchDisputed(Box::new(session.clone())),
                    None,
                );
            }
            Reconciliation::Agreed(outcome) => {
                session.apply_outcome(&outcome);
                let applied = self.ledger.settle(&mut session, &outcome).await?;
                session.transition(MatchStatus::Completed, now)?;
                if let Err(e) = self.persist(&mut session).await {
                    self.ledger.revert(&session, &applied).await;
                    return Err(e);
                }
                info!(match_id = %session.id, winner = ?session.winner_id, "Match completed");
                self.notifier.to_room(
                    session.room_id(),
                    ServerEvent::MatchCompleted(Box::new(session.clone())),
                    None,
                );
            }
        }
        Ok(session)
    }

    /// Materializes a queue pairing as an already-accepted, unstaked match.
    /// Fails with `DuplicateActiveMatch` when the pair already has an active match.
    pub async fn create_paired(
        &self,
        waiting: &QueueEntry,
        arriving: &QueueEntry,
    ) -> Result<MatchSession, MatchServiceError> {
        let _pair = self
            .locks
            .lock(&pair_key(&waiting.user_id, &arriving.user_id))
            .await;
        if self
            .matches
            .find_active_between(&waiting.user_id, &arriving.user_id)
            .await?
            .is_some()
        {
            return Err(MatchServiceError::DuplicateActiveMatch);
        }

        let session = MatchSession::paired(&waiting.user_id, &arriving.user_id, arriving.mode);
        self.matches.create_match(&session).await?;
        info!(match_id = %session.id, player1 = %waiting.user_id, player2 = %arriving.user_id, mode = %session.mode, "Queue match created");

        for (player, opponent) in [(waiting, arriving), (arriving, waiting)] {
            self.notifier.join_room(&player.user_id, session.room_id());
            self.notifier.to_user(
                &player.user_id,
                ServerEvent::MatchFound {
                    match_id: session.id.clone(),
                    opponent: PlayerSummary::from(opponent),
                },
            );
        }
        Ok(session)
    }

    pub async fn get(&self, match_id: &str, viewer_id: &str) -> Result<MatchSession, MatchServiceError> {
        let session = self.load(match_id).await?;
        if !session.is_participant(viewer_id) {
            return Err(MatchServiceError::Forbidden(
                "you are not playing in this match".to_string(),
            ));
        }
        Ok(session)
    }

    pub async fn list_pending(&self, user_id: &str) -> Result<PendingChallengesResponse, MatchServiceError> {
        let sessions = self.matches.list_pending_for(user_id).await?;
        let mut challenges = Vec::with_capacity(sessions.len());
        for session in sessions {
            challenges.push(PendingChallenge {
                challenger: self.summary(&session.player1_id).await,
                id: session.id,
                mode: session.mode,
                bet_amount: session.bet_amount,
                created_at: session.created_at,
            });
        }
        Ok(PendingChallengesResponse {
            count: challenges.len(),
            challenges,
        })
    }

    pub async fn list_active(&self, user_id: &str) -> Result<ActiveMatchesResponse, MatchServiceError> {
        let sessions = self
            .matches
            .list_for_player(user_id, &MatchStatus::IN_PLAY)
            .await?;
        let mut matches = Vec::with_capacity(sessions.len());
        for session in sessions {
            let opponent_id = session.opponent_of(user_id).unwrap_or_default().to_string();
            matches.push(ActiveMatch {
                opponent: self.summary(&opponent_id).await,
                has_submitted_result: session.has_submitted(user_id),
                id: session.id,
                mode: session.mode,
                status: session.status,
                bet_amount: session.bet_amount,
                created_at: session.created_at,
            });
        }
        Ok(ActiveMatchesResponse {
            count: matches.len(),
            matches,
        })
    }

    /// Rooms a (re)connecting player should be in: those of their in-play matches.
    pub async fn active_room_ids(&self, user_id: &str) -> Result<Vec<String>, MatchServiceError> {
        Ok(self
            .matches
            .list_for_player(user_id, &MatchStatus::IN_PLAY)
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect())
    }

    /// Cancels PENDING challenges created before `cutoff`. No funds were held.
    pub async fn expire_pending(&self, cutoff: DateTime<Utc>) -> Result<usize, MatchServiceError> {
        let stale = self.matches.list_by_status(MatchStatus::Pending).await?;
        let mut cancelled = 0;
        for session in stale.into_iter().filter(|s| s.created_at < cutoff) {
            if self.try_cancel_expired(&session.id, cutoff).await {
                cancelled += 1;
            }
        }
        Ok(cancelled)
    }

    /// Cancels ACCEPTED or PLAYING matches nobody reported on since before
    /// `cutoff`, refunding any held stake.
    pub async fn expire_abandoned(&self, cutoff: DateTime<Utc>) -> Result<usize, MatchServiceError> {
        let mut stale = self.matches.list_by_status(MatchStatus::Accepted).await?;
        stale.extend(self.matches.list_by_status(MatchStatus::Playing).await?);
        let mut cancelled = 0;
        for session in stale.into_iter().filter(|s| is_idle(s, cutoff)) {
            if self.try_cancel_expired(&session.id, cutoff).await {
                cancelled += 1;
            }
        }
        Ok(cancelled)
    }

    /// One failed match does not stop the rest of a sweep; it is retried on the next one.
    async fn try_cancel_expired(&self, match_id: &str, cutoff: DateTime<Utc>) -> bool {
        match self.cancel_expired(match_id, cutoff).await {
            Ok(cancelled) => cancelled,
            Err(e) => {
                error!(match_id = %match_id, error = %e, "Failed to expire match");
                false
            }
        }
    }

    /// Re-reads the match under its lock and cancels it if it is still idle.
    async fn cancel_expired(&self, match_id: &str, cutoff: DateTime<Utc>) -> Result<bool, MatchServiceError> {
        let _guard = self.locks.lock(&match_key(match_id)).await;
        let mut session = self.load(match_id).await?;
        if !is_idle(&session, cutoff) {
            return Ok(false);
        }

        session.transition(MatchStatus::Cancelled, Utc::now())?;
        session.cancel_reason = Some("expired".to_string());
        // The refund is stored before coins move: a failed write leaves the
        // stake held for the next sweep, and a stored refund is never repaid.
        let owed = EscrowLedger::mark_refunded(&mut session);
        self.persist(&mut session).await?;
        if let Some(entry) = &owed {
            if let Err(e) = self.ledger.return_stakes(&session, entry).await {
                error!(match_id = %session.id, error = %e, stake = entry.total(), "Expired match stored as refunded but stakes not returned");
            }
        }
        warn!(match_id = %session.id, refunded = owed.is_some(), "Match expired");

        let event = ServerEvent::MatchCancelled(Box::new(session.clone()));
        if session.accepted_at.is_some() {
            self.notifier.to_room(session.room_id(), event, None);
        } else {
            // Nobody has joined the room of an unanswered challenge.
            self.notifier.to_user(&session.player1_id, event.clone());
            self.notifier.to_user(&session.player2_id, event);
        }
        Ok(true)
    }
}

/// Still waiting on a response or on any result since before `cutoff`.
fn is_idle(session: &MatchSession, cutoff: DateTime<Utc>) -> bool {
    match session.status {
        MatchStatus::Pending => session.created_at < cutoff,
        MatchStatus::Accepted | MatchStatus::Playing => {
            let last_activity = session
                .started_at
                .or(session.accepted_at)
                .unwrap_or(session.created_at);
            session.player1_claim.is_none()
                && session.player2_claim.is_none()
                && last_activity < cutoff
        }
        _ => false,
    }
}
