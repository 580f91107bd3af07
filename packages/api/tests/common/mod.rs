#![allow(dead_code)]

use futures::{SinkExt, StreamExt};
use rand::{distributions::Alphanumeric, Rng};
use reqwest::{Client, Response};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use arena_api::{app, state::AppState};
use shared::models::profile::Profile;
use shared::repositories::match_repository::InMemoryMatchRepository;
use shared::repositories::profile_repository::{InMemoryProfileRepository, ProfileRepository};
use shared::services::auth_service::{AuthService, AuthServiceTrait};

pub type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const JWT_SECRET: &str = "integration-test-secret";

pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub auth: AuthService,
    pub profiles: Arc<InMemoryProfileRepository>,
}

pub fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Serves the full router on an ephemeral port over in-memory stores.
pub async fn spawn_app() -> TestApp {
    let profiles = Arc::new(InMemoryProfileRepository::new());
    let state = AppState::new(
        AuthService::with_jwt_secret(JWT_SECRET.to_string()),
        Arc::new(InMemoryMatchRepository::new()),
        profiles.clone(),
    );

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let address = listener.local_addr().expect("No local address").to_string();
    tokio::spawn(async move {
        axum::serve(listener, app(state)).await.expect("Server error");
    });

    TestApp {
        address,
        client: Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client"),
        auth: AuthService::with_jwt_secret(JWT_SECRET.to_string()),
        profiles,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.address, path)
    }

    /// Creates a profile with `coins` and returns (user id, bearer token).
    pub async fn player(&self, coins: i64) -> (String, String) {
        let user_id = format!("it_{}", random_string(10));
        self.profiles
            .insert(Profile::new(&user_id, Some(&format!("Nick {}", user_id))).with_coins(coins))
            .await;
        let token = self
            .auth
            .generate_token(&user_id)
            .expect("Failed to sign token")
            .token;
        (user_id, token)
    }

    pub async fn coins(&self, user_id: &str) -> i64 {
        self.profiles
            .get_profile(user_id)
            .await
            .expect("Profile missing")
            .coins
    }

    pub async fn get(&self, path: &str, token: &str) -> Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to send GET")
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to send POST")
    }

    /// Opens a socket and waits until the server has registered it.
    pub async fn connect(&self, token: &str) -> Socket {
        let url = format!("ws://{}/ws?token={}", self.address, token);
        let (mut socket, _) = connect_async(url).await.expect("WebSocket handshake failed");
        expect_event(&mut socket, "online_count").await;
        socket
    }
}

pub async fn send_json(socket: &mut Socket, value: Value) {
    socket
        .send(Message::Text(value.to_string()))
        .await
        .expect("Failed to send frame");
}

/// Reads frames until an event of `kind` arrives, skipping everything else.
pub async fn expect_event(socket: &mut Socket, kind: &str) -> Value {
    let wait = async {
        while let Some(frame) = socket.next().await {
            if let Ok(Message::Text(text)) = frame {
                let event: Value = serde_json::from_str(&text).expect("Event is not JSON");
                if event["type"] == kind {
                    return event;
                }
            }
        }
        panic!("Socket closed while waiting for {}", kind);
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .unwrap_or_else(|_| panic!("Timed out waiting for {}", kind))
}

/// Waits for the server's close frame and returns its code.
pub async fn expect_close(socket: &mut Socket) -> u16 {
    let wait = async {
        while let Some(frame) = socket.next().await {
            if let Ok(Message::Close(Some(close))) = frame {
                return u16::from(close.code);
            }
        }
        panic!("Socket ended without a close frame");
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .expect("Timed out waiting for close")
}
