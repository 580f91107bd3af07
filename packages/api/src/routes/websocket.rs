use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::{actions, error::ApiError, state::AppState};
use shared::services::auth_service::AuthServiceTrait;
use shared::services::connection_registry::{Outgoing, OutgoingReceiver};

pub fn routes() -> Router<AppState> {
    Router::new().route("/ws", get(websocket_handler))
}

#[derive(Debug, Deserialize)]
pub struct WebSocketAuth {
    token: Option<String>,
}

/// Authenticates before the upgrade so a rejected caller never touches the registry.
async fn websocket_handler(
    State(state): State<AppState>,
    Query(auth): Query<WebSocketAuth>,
    ws: WebSocketUpgrade,
) -> Response {
    let token = auth.token.unwrap_or_default();
    let user_id = match state.auth_service.extract_user_id_from_token(&token) {
        Ok(user_id) => user_id,
        Err(e) => {
            debug!(error = %e, "Rejected websocket connection");
            return ApiError::from(e).into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, user_id, state))
}

async fn handle_socket(socket: WebSocket, user_id: String, state: AppState) {
    let (sink, mut stream) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel();
    let connection_id = actions::connect::handle_connect(&state, &user_id, tx).await;

    let mut writer = tokio::spawn(write_outgoing(sink, rx));

    let reader_state = state.clone();
    let reader_user = user_id.clone();
    let mut reader = tokio::spawn(async move {
        while let Some(Ok(message)) = stream.next().await {
            match message {
                Message::Text(text) => {
                    actions::default::handle_message(&reader_state, &reader_user, text.as_str())
                        .await
                }
                Message::Close(_) => break,
                Message::Binary(_) => {
                    actions::default::reply_error(&reader_state, &reader_user, "Binary frames are not supported")
                        .await
                }
                Message::Ping(_) | Message::Pong(_) => {}
            }
        }
    });

    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }

    actions::disconnect::handle_disconnect(&state, &user_id, &connection_id).await;
}

/// Drains the connection's outgoing queue into the socket until it closes.
async fn write_outgoing(
    mut sink: futures::stream::SplitSink<WebSocket, Message>,
    mut rx: OutgoingReceiver,
) {
    while let Some(outgoing) = rx.recv().await {
        match outgoing {
            Outgoing::Event(event) => {
                let text = match event.to_json() {
                    Ok(text) => text,
                    Err(e) => {
                        error!(error = %e, "Failed to serialize event");
                        continue;
                    }
                };
                if sink.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            Outgoing::Close { code, reason } => {
                let frame = CloseFrame {
                    code,
                    reason: reason.into(),
                };
                let _ = sink.send(Message::Close(Some(frame))).await;
                break;
            }
        }
    }
}
