use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use crate::models::queue::QueueEntry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The arrival was paired with `waiting`, which sat at `waiting_index`.
    /// Neither entry remains queued.
    Paired {
        waiting: QueueEntry,
        arriving: QueueEntry,
        waiting_index: usize,
    },
    Queued {
        position: usize,
        queue_size: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlreadyQueued;

/// Waiting pool in insertion order. A user id appears at most once across
/// all modes.
#[derive(Default)]
pub struct MatchmakingQueue {
    entries: Mutex<Vec<QueueEntry>>,
}

impl MatchmakingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pairs the arrival with the oldest entry of the same mode, or queues it.
    pub async fn join(&self, entry: QueueEntry) -> Result<JoinOutcome, AlreadyQueued> {
        let mut entries = self.entries.lock().await;
        if entries.iter().any(|e| e.user_id == entry.user_id) {
            return Err(AlreadyQueued);
        }

        if let Some(index) = entries.iter().position(|e| e.mode == entry.mode) {
            let waiting = entries.remove(index);
            debug!(waiting = %waiting.user_id, arriving = %entry.user_id, mode = %entry.mode, "Queue pairing");
            return Ok(JoinOutcome::Paired {
                waiting,
                arriving: entry,
                waiting_index: index,
            });
        }

        entries.push(entry);
        Ok(JoinOutcome::Queued {
            position: entries.len(),
            queue_size: entries.len(),
        })
    }

    /// Puts a paired-off entry back where it was, unless its owner has queued
    /// again in the meantime.
    pub async fn restore(&self, entry: QueueEntry, index: usize) {
        let mut entries = self.entries.lock().await;
        if entries.iter().any(|e| e.user_id == entry.user_id) {
            return;
        }
        let index = index.min(entries.len());
        entries.insert(index, entry);
    }

    /// Removes the user's entry. Idempotent; returns whether one existed.
    pub async fn leave(&self, user_id: &str) -> bool {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|e| e.user_id != user_id);
        entries.len() != before
    }

    /// 1-based position and entry of a queued user.
    pub async fn status(&self, user_id: &str) -> Option<(usize, QueueEntry)> {
        let entries = self.entries.lock().await;
        entries
            .iter()
            .position(|e| e.user_id == user_id)
            .map(|index| (index + 1, entries[index].clone()))
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Drops and returns entries that joined before `cutoff`.
    pub async fn expire(&self, cutoff: DateTime<Utc>) -> Vec<QueueEntry> {
        let mut entries = self.entries.lock().await;
        let (expired, kept): (Vec<_>, Vec<_>) = entries
            .drain(..)
            .partition(|e| e.joined_at < cutoff);
        *entries = kept;
        expired
    }
}
