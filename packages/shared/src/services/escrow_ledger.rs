use std::sync::Arc;
use tracing::{error, info};

use crate::models::match_session::{EscrowEntry, EscrowStatus, MatchOutcome, MatchSession};
use crate::models::profile::ProfileDelta;
use crate::repositories::profile_repository::ProfileRepository;
use crate::services::errors::match_service_errors::MatchServiceError;
use crate::services::keyed_locks::KeyedLocks;

/// Moves staked coins between player balances. Every balance change for a
/// pair of players runs under both players' balance locks.
pub struct EscrowLedger {
    profiles: Arc<dyn ProfileRepository>,
    balance_locks: KeyedLocks,
}

impl EscrowLedger {
    pub fn new(profiles: Arc<dyn ProfileRepository>) -> Self {
        EscrowLedger {
            profiles,
            balance_locks: KeyedLocks::new(),
        }
    }

    async fn apply(&self, session: &MatchSession, deltas: &[ProfileDelta]) -> Result<(), MatchServiceError> {
        let _guards = self
            .balance_locks
            .lock_many(&[session.player1_id.as_str(), session.player2_id.as_str()])
            .await;
        self.profiles.apply_deltas(deltas).await?;
        Ok(())
    }

    /// Debits the stake from both players, both or neither. Returns `None`
    /// for unstaked matches.
    pub async fn hold(&self, session: &MatchSession) -> Result<Option<EscrowEntry>, MatchServiceError> {
        if session.bet_amount <= 0 {
            return Ok(None);
        }
        let stake = session.bet_amount;
        self.apply(
            session,
            &[
                ProfileDelta::coins(&session.player1_id, -stake),
                ProfileDelta::coins(&session.player2_id, -stake),
            ],
        )
        .await?;
        info!(match_id = %session.id, stake, "Escrow held");
        Ok(Some(EscrowEntry::held(stake)))
    }

    /// Undoes a [`hold`](Self::hold) whose match transition could not be stored.
    pub async fn cancel_hold(&self, session: &MatchSession, entry: &EscrowEntry) {
        if let Err(e) = self.return_stakes(session, entry).await {
            error!(match_id = %session.id, error = %e, "Failed to return held stake");
        }
    }

    /// Credits each player with the stake `entry` holds for them.
    pub async fn return_stakes(&self, session: &MatchSession, entry: &EscrowEntry) -> Result<(), MatchServiceError> {
        self.apply(
            session,
            &[
                ProfileDelta::coins(&session.player1_id, entry.player1_held),
                ProfileDelta::coins(&session.player2_id, entry.player2_held),
            ],
        )
        .await?;
        info!(match_id = %session.id, "Escrow refunded");
        Ok(())
    }

    /// Marks held escrow refunded without moving coins and returns the entry
    /// whose stakes are now owed back. `None` when nothing is held.
    pub fn mark_refunded(session: &mut MatchSession) -> Option<EscrowEntry> {
        let entry = session.escrow.as_mut().filter(|e| e.is_held())?;
        let owed = entry.clone();
        entry.status = EscrowStatus::Refunded;
        Some(owed)
    }

    /// Coin, rating and counter changes for a reconciled match. The winner
    /// takes the whole pot; a draw returns each player's own stake.
    pub fn settlement_deltas(session: &MatchSession, outcome: &MatchOutcome) -> Vec<ProfileDelta> {
        let [mut player1, mut player2] = outcome.profile_deltas(session);
        if let Some(entry) = session.escrow.as_ref().filter(|e| e.is_held()) {
            match outcome.winner_id.as_deref() {
                Some(winner) if winner == session.player1_id => player1.coins += entry.total(),
                Some(_) => player2.coins += entry.total(),
                None => {
                    player1.coins += entry.player1_held;
                    player2.coins += entry.player2_held;
                }
            }
        }
        vec![player1, player2]
    }

    /// Pays out the escrow and applies ratings and counters in one batch,
    /// marking the escrow released. Returns the applied deltas so the caller
    /// can revert them if the match cannot be stored.
    pub async fn settle(
        &self,
        session: &mut MatchSession,
        outcome: &MatchOutcome,
    ) -> Result<Vec<ProfileDelta>, MatchServiceError> {
        let deltas = Self::settlement_deltas(session, outcome);
        self.apply(session, &deltas).await?;
        if let Some(entry) = session.escrow.as_mut() {
            entry.status = EscrowStatus::Released;
        }
        info!(match_id = %session.id, winner = ?outcome.winner_id, "Match settled");
        Ok(deltas)
    }

    /// Reverts a settlement whose match transition could not be stored.
    pub async fn revert(&self, session: &MatchSession, deltas: &[ProfileDelta]) {
        let inverse: Vec<ProfileDelta> = deltas.iter().map(ProfileDelta::inverse).collect();
        if let Err(e) = self.apply(session, &inverse).await {
            error!(match_id = %session.id, error = %e, "Failed to revert settlement");
        }
    }
}
