use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{book_session, counselor_sessions, list_counselors};
use crate::app_state::AppState;

pub fn counseling_routes() -> Router<AppState> {
    Router::new()
        .route("/counselors", get(list_counselors))
        .route("/counselors/{id}/sessions", get(counselor_sessions))
        .route("/sessions", post(book_session))
}
