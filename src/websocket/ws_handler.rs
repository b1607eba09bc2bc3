use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::api::{ApiError, AuthToken};
use crate::app_state::AppState;
use crate::error::{AppError, LOGIN_PATH};
use crate::modules::sessions::handlers::load_overview;

#[derive(Debug, Deserialize)]
pub struct FeedParams {
    /// Browsers cannot set headers on a WebSocket handshake, so the JWT rides
    /// in the query string.
    pub token: String,
}

pub async fn session_feed(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<FeedParams>,
) -> impl IntoResponse {
    let token = AuthToken::new(params.token);
    ws.on_upgrade(move |socket| handle_socket(socket, state, token))
}

/// Pushes the session overview on connect, then every refresh interval.
/// A text frame reading `refresh` forces an immediate push.
async fn handle_socket(socket: WebSocket, state: AppState, token: AuthToken) {
    let (mut sender, mut receiver) = socket.split();
    let refresh = Arc::new(Notify::new());

    let refresh_requested = refresh.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) if text.as_str().trim() == "refresh" => refresh_requested.notify_one(),
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    let period = state.env.session_refresh_interval();
    let mut send_task = tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {},
                _ = refresh.notified() => {},
            }

            let frame = match load_overview(state.api.as_ref(), &token).await {
                Ok(overview) => json!({ "type": "sessions", "data": overview }),
                Err(AppError::Upstream(ApiError::Unauthorized)) => {
                    let frame = json!({ "type": "unauthorized", "redirect": LOGIN_PATH });
                    let _ = sender.send(Message::Text(frame.to_string().into())).await;
                    break;
                }
                Err(AppError::Upstream(err)) => {
                    warn!(error = %err, "Session feed refresh failed");
                    json!({ "type": "error", "message": err.user_message() })
                }
                Err(e) => {
                    warn!(error = %e, "Session feed refresh failed");
                    json!({ "type": "error", "message": e.to_string() })
                }
            };
            if sender.send(Message::Text(frame.to_string().into())).await.is_err() {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    }
    debug!("Session feed closed");
}
