mod common;

use serde_json::json;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Error as WsError;

use common::{expect_close, expect_event, send_json, spawn_app};

#[tokio::test]
async fn test_connection_without_valid_token_is_rejected() {
    let app = spawn_app().await;

    for url in [
        format!("ws://{}/ws", app.address),
        format!("ws://{}/ws?token=bogus", app.address),
    ] {
        match connect_async(url).await {
            Err(WsError::Http(response)) => assert_eq!(response.status(), 401),
            Err(other) => panic!("unexpected handshake error: {}", other),
            Ok(_) => panic!("handshake should have been rejected"),
        }
    }

    let health: serde_json::Value = app
        .client
        .get(app.url("/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["online"], 0);
}

#[tokio::test]
async fn test_ping_and_malformed_frames() {
    let app = spawn_app().await;
    let (_, token) = app.player(0).await;
    let mut socket = app.connect(&token).await;

    send_json(&mut socket, json!({ "type": "ping" })).await;
    let pong = expect_event(&mut socket, "pong").await;
    assert!(pong["data"]["timestamp"].is_string());

    send_json(&mut socket, json!({ "type": "dance" })).await;
    let unknown = expect_event(&mut socket, "error").await;
    assert_eq!(unknown["data"]["message"], "Unknown message type: dance");

    send_json(&mut socket, json!({ "type": "join_room", "data": {} })).await;
    let malformed = expect_event(&mut socket, "error").await;
    assert!(malformed["data"]["message"]
        .as_str()
        .unwrap()
        .starts_with("Invalid join_room payload"));

    send_json(&mut socket, json!({ "type": "ping" })).await;
    expect_event(&mut socket, "pong").await;
}

#[tokio::test]
async fn test_second_connection_replaces_first() {
    let app = spawn_app().await;
    let (_, token) = app.player(0).await;
    let mut first = app.connect(&token).await;

    let mut second = app.connect(&token).await;

    assert_eq!(expect_close(&mut first).await, 4000);
    send_json(&mut second, json!({ "type": "ping" })).await;
    expect_event(&mut second, "pong").await;
}

#[tokio::test]
async fn test_online_status_reflects_connections() {
    let app = spawn_app().await;
    let (a, token_a) = app.player(0).await;
    let (b, _) = app.player(0).await;
    let mut socket = app.connect(&token_a).await;

    send_json(
        &mut socket,
        json!({ "type": "get_online_status", "data": { "user_ids": [a, b] } }),
    )
    .await;
    let status = expect_event(&mut socket, "online_status").await;

    assert_eq!(status["data"][a.as_str()], true);
    assert_eq!(status["data"][b.as_str()], false);
}

#[tokio::test]
async fn test_match_events_reach_both_players() {
    let app = spawn_app().await;
    let (a, token_a) = app.player(100).await;
    let (b, token_b) = app.player(100).await;
    let mut socket_a = app.connect(&token_a).await;
    let mut socket_b = app.connect(&token_b).await;

    let created: serde_json::Value = app
        .post("/matches/challenge", &token_a, json!({ "opponent_id": b }))
        .await
        .json()
        .await
        .unwrap();
    let match_id = created["match_id"].as_str().unwrap().to_string();

    let challenge = expect_event(&mut socket_b, "new_challenge").await;
    assert_eq!(challenge["data"]["challenger"]["id"], a.as_str());

    app.post(&format!("/matches/{}/accept", match_id), &token_b, json!({}))
        .await;
    let accepted = expect_event(&mut socket_a, "challenge_accepted").await;
    assert_eq!(accepted["data"]["opponent_id"], b.as_str());

    send_json(
        &mut socket_b,
        json!({ "type": "score_update", "data": { "match_id": match_id, "my_score": 1, "opponent_score": 0 } }),
    )
    .await;
    let score = expect_event(&mut socket_a, "score_updated").await;
    assert_eq!(score["data"]["user_id"], b.as_str());
    assert_eq!(score["data"]["my_score"], 1);

    app.post(
        &format!("/matches/{}/result", match_id),
        &token_a,
        json!({ "my_score": 0, "opponent_score": 1 }),
    )
    .await;
    app.post(
        &format!("/matches/{}/result", match_id),
        &token_b,
        json!({ "my_score": 1, "opponent_score": 0 }),
    )
    .await;

    for socket in [&mut socket_a, &mut socket_b] {
        let completed = expect_event(socket, "match_completed").await;
        assert_eq!(completed["data"]["winner_id"], b.as_str());
    }
}

#[tokio::test]
async fn test_room_join_is_limited_to_participants() {
    let app = spawn_app().await;
    let (_, token_a) = app.player(0).await;
    let (b, _) = app.player(0).await;
    let (_, token_c) = app.player(0).await;
    let created: serde_json::Value = app
        .post("/matches/challenge", &token_a, json!({ "opponent_id": b }))
        .await
        .json()
        .await
        .unwrap();
    let match_id = created["match_id"].as_str().unwrap().to_string();
    let mut socket_a = app.connect(&token_a).await;
    let mut socket_c = app.connect(&token_c).await;

    send_json(&mut socket_c, json!({ "type": "join_room", "data": { "room_id": match_id } })).await;
    let refused = expect_event(&mut socket_c, "error").await;
    assert!(refused["data"]["message"]
        .as_str()
        .unwrap()
        .starts_with("Cannot join room"));

    send_json(&mut socket_a, json!({ "type": "join_room", "data": { "room_id": match_id } })).await;
    let joined = expect_event(&mut socket_a, "room_joined").await;
    assert_eq!(joined["data"]["room_id"], match_id.as_str());

    send_json(&mut socket_a, json!({ "type": "leave_room", "data": { "room_id": match_id } })).await;
    expect_event(&mut socket_a, "room_left").await;
}
