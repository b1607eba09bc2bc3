use axum::{routing::get, Router};

use super::session_feed;
use crate::app_state::AppState;

pub fn websocket_routes() -> Router<AppState> {
    Router::new().route("/ws/sessions", get(session_feed))
}
