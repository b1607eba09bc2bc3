use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{cancel_session, list_sessions, reschedule_session, stats};
use crate::app_state::AppState;

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sessions))
        .route("/stats", get(stats))
        .route("/{id}/cancel", post(cancel_session))
        .route("/{id}/reschedule", post(reschedule_session))
}
