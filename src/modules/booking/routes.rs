use axum::{
    routing::{get, post, put},
    Router,
};

use super::handlers::{
    advance, available_dates, available_times, booking_options, current_booking, go_back, pay, start_booking,
    submit, update_draft,
};
use crate::app_state::AppState;

pub fn booking_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(current_booking))
        .route("/options", get(booking_options))
        .route("/start", post(start_booking))
        .route("/draft", put(update_draft))
        .route("/advance", post(advance))
        .route("/back", post(go_back))
        .route("/dates", get(available_dates))
        .route("/times", get(available_times))
        .route("/submit", post(submit))
        .route("/payment", post(pay))
}
