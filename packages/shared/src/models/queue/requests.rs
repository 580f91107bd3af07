use serde::{Deserialize, Serialize};

use crate::models::match_session::GameMode;

fn default_mode() -> GameMode {
    GameMode::Ranked
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JoinQueueRequest {
    #[serde(default = "default_mode")]
    pub mode: GameMode,
}

impl Default for JoinQueueRequest {
    fn default() -> Self {
        JoinQueueRequest {
            mode: default_mode(),
        }
    }
}
