use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::models::match_session::{GameMode, MatchSession};
use crate::models::matches::responses::PlayerSummary;

/// Events pushed to clients over the real-time channel, framed as
/// `{"type": ..., "data": ...}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    Pong {
        timestamp: DateTime<Utc>,
    },
    RoomJoined {
        room_id: String,
    },
    RoomLeft {
        room_id: String,
    },
    ChallengeAccepted {
        match_id: String,
        opponent_id: String,
        opponent_name: String,
    },
    ChallengeDeclined {
        match_id: String,
        opponent_id: String,
        opponent_name: String,
    },
    ScoreUpdated {
        match_id: String,
        user_id: String,
        my_score: u32,
        opponent_score: u32,
        timestamp: DateTime<Utc>,
    },
    OnlineStatus(BTreeMap<String, bool>),
    UserTyping {
        user_id: String,
        is_typing: bool,
    },
    OnlineCount {
        count: usize,
    },
    NewChallenge {
        match_id: String,
        challenger: PlayerSummary,
        mode: GameMode,
        bet_amount: i64,
    },
    MatchFound {
        match_id: String,
        opponent: PlayerSummary,
    },
    MatchStarted(Box<MatchSession>),
    ResultSubmitted(Box<MatchSession>),
    MatchCompleted(Box<MatchSession>),
    MatchDisputed(Box<MatchSession>),
    MatchCancelled(Box<MatchSession>),
    QueueExpired {
        mode: GameMode,
    },
    Error {
        message: String,
    },
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Raw client frame. `data` is optional so a bare `{"type": "ping"}` is valid.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomPayload {
    pub room_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChallengeReplyPayload {
    pub match_id: String,
    pub challenger_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoreUpdatePayload {
    pub match_id: String,
    pub my_score: u32,
    pub opponent_score: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OnlineStatusPayload {
    pub user_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypingPayload {
    pub to_user_id: String,
    pub is_typing: bool,
}

#[derive(Debug, Clone)]
pub enum ClientMessage {
    Ping,
    JoinRoom(RoomPayload),
    LeaveRoom(RoomPayload),
    ChallengeAccepted(ChallengeReplyPayload),
    ChallengeDeclined(ChallengeReplyPayload),
    ScoreUpdate(ScoreUpdatePayload),
    GetOnlineStatus(OnlineStatusPayload),
    Typing(TypingPayload),
}

impl ClientMessage {
    /// Parses a text frame. The error string is sent back to the client as-is.
    pub fn parse(text: &str) -> Result<Self, String> {
        let envelope: Envelope =
            serde_json::from_str(text).map_err(|e| format!("Invalid message: {}", e))?;
        let data = envelope.data;

        fn payload<T: serde::de::DeserializeOwned>(kind: &str, data: Value) -> Result<T, String> {
            serde_json::from_value(data).map_err(|e| format!("Invalid {} payload: {}", kind, e))
        }

        match envelope.kind.as_str() {
            "ping" => Ok(ClientMessage::Ping),
            "join_room" => payload("join_room", data).map(ClientMessage::JoinRoom),
            "leave_room" => payload("leave_room", data).map(ClientMessage::LeaveRoom),
            "challenge_accepted" => {
                payload("challenge_accepted", data).map(ClientMessage::ChallengeAccepted)
            }
            "challenge_declined" => {
                payload("challenge_declined", data).map(ClientMessage::ChallengeDeclined)
            }
            "score_update" => payload("score_update", data).map(ClientMessage::ScoreUpdate),
            "get_online_status" => {
                payload("get_online_status", data).map(ClientMessage::GetOnlineStatus)
            }
            "typing" => payload("typing", data).map(ClientMessage::Typing),
            other => Err(format!("Unknown message type: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_server_event_envelope_shape() {
        let event = ServerEvent::RoomJoined {
            room_id: "match-1".to_string(),
        };
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value, json!({"type": "room_joined", "data": {"room_id": "match-1"}}));
    }

    #[test]
    fn test_online_status_is_a_flat_map() {
        let mut statuses = BTreeMap::new();
        statuses.insert("u1".to_string(), true);
        statuses.insert("u2".to_string(), false);

        let value = serde_json::to_value(ServerEvent::OnlineStatus(statuses)).unwrap();
        assert_eq!(value["type"], "online_status");
        assert_eq!(value["data"], json!({"u1": true, "u2": false}));
    }

    #[test]
    fn test_match_event_carries_session() {
        let session = MatchSession::paired("a", "b", GameMode::Ranked);
        let value = serde_json::to_value(ServerEvent::MatchStarted(Box::new(session.clone()))).unwrap();

        assert_eq!(value["type"], "match_started");
        assert_eq!(value["data"]["id"], json!(session.id));
        assert_eq!(value["data"]["status"], "ACCEPTED");
    }

    #[test]
    fn test_parse_ping_without_data() {
        assert!(matches!(ClientMessage::parse(r#"{"type":"ping"}"#), Ok(ClientMessage::Ping)));
        assert!(matches!(
            ClientMessage::parse(r#"{"type":"ping","data":{}}"#),
            Ok(ClientMessage::Ping)
        ));
    }

    #[test]
    fn test_parse_score_update() {
        let parsed = ClientMessage::parse(
            r#"{"type":"score_update","data":{"match_id":"m1","my_score":2,"opponent_score":1}}"#,
        )
        .unwrap();

        match parsed {
            ClientMessage::ScoreUpdate(p) => {
                assert_eq!(p.match_id, "m1");
                assert_eq!((p.my_score, p.opponent_score), (2, 1));
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_and_malformed() {
        let unknown = ClientMessage::parse(r#"{"type":"dance","data":{}}"#).unwrap_err();
        assert!(unknown.contains("Unknown message type"));

        let missing = ClientMessage::parse(r#"{"type":"join_room","data":{}}"#).unwrap_err();
        assert!(missing.contains("join_room"));

        assert!(ClientMessage::parse("not json").is_err());
    }
}
