mod common;

use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{expect_event, spawn_app};

#[tokio::test]
async fn test_two_ranked_players_get_matched() {
    let app = spawn_app().await;
    let (a, token_a) = app.player(100).await;
    let (b, token_b) = app.player(100).await;
    let mut socket_a = app.connect(&token_a).await;

    let first: Value = app
        .post("/queue/join", &token_a, json!({ "mode": "ranked" }))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(first["status"], "searching");
    assert_eq!(first["position"], 1);

    let second: Value = app
        .post("/queue/join", &token_b, json!({ "mode": "ranked" }))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(second["status"], "match_found");
    assert_eq!(second["opponent"]["id"], a.as_str());
    let match_id = second["match_id"].as_str().unwrap().to_string();

    let found = expect_event(&mut socket_a, "match_found").await;
    assert_eq!(found["data"]["match_id"], match_id.as_str());
    assert_eq!(found["data"]["opponent"]["id"], b.as_str());

    let session: Value = app
        .get(&format!("/matches/{}", match_id), &token_a)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(session["status"], "ACCEPTED");

    let status: Value = app.get("/queue/status", &token_a).await.json().await.unwrap();
    assert_eq!(status["in_queue"], false);
    assert_eq!(status["queue_size"], 0);
}

#[tokio::test]
async fn test_queue_join_leave_and_status() {
    let app = spawn_app().await;
    let (_, token) = app.player(100).await;

    let joined = app.post("/queue/join", &token, json!({ "mode": "friendly" })).await;
    assert_eq!(joined.status(), StatusCode::OK);
    let again = app.post("/queue/join", &token, json!({})).await;
    assert_eq!(again.status(), StatusCode::CONFLICT);

    let status: Value = app.get("/queue/status", &token).await.json().await.unwrap();
    assert_eq!(status["in_queue"], true);
    assert_eq!(status["mode"], "friendly");

    let left: Value = app.post("/queue/leave", &token, json!({})).await.json().await.unwrap();
    assert_eq!(left["status"], "left");
    let left_again: Value = app.post("/queue/leave", &token, json!({})).await.json().await.unwrap();
    assert_eq!(left_again["status"], "not_in_queue");
}

#[tokio::test]
async fn test_staked_queue_is_rejected() {
    let app = spawn_app().await;
    let (_, token) = app.player(100).await;

    let resp = app.post("/queue/join", &token, json!({ "mode": "staked" })).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
