use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::match_session::GameMode;
use crate::models::matches::responses::PlayerSummary;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JoinQueueResponse {
    MatchFound {
        match_id: String,
        opponent: PlayerSummary,
    },
    Searching {
        position: usize,
        queue_size: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveQueueStatus {
    Left,
    NotInQueue,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LeaveQueueResponse {
    pub status: LeaveQueueStatus,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueStatusResponse {
    pub in_queue: bool,
    pub position: Option<usize>,
    pub queue_size: usize,
    pub mode: Option<GameMode>,
    pub joined_at: Option<DateTime<Utc>>,
}
