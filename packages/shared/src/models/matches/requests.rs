use serde::{Deserialize, Serialize};

use crate::models::match_session::GameMode;
use crate::models::matches::responses::MatchResult;

fn default_mode() -> GameMode {
    GameMode::Ranked
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChallengeRequest {
    pub opponent_id: String,
    #[serde(default = "default_mode")]
    pub mode: GameMode,
    #[serde(default)]
    pub bet_amount: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubmitResultRequest {
    pub my_score: u32,
    pub opponent_score: u32,
    pub screenshot_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HistoryQuery {
    pub mode: Option<GameMode>,
    pub result: Option<MatchResult>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OnlinePlayersQuery {
    pub limit: Option<usize>,
}
