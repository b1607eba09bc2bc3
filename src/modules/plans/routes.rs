use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    change_plan, confirm_change_plan, list_plans, my_plans, pending_change_plan, purchase, quote,
};
use crate::app_state::AppState;

pub fn plan_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_plans))
        .route("/mine", get(my_plans))
        .route("/quote", post(quote))
        .route("/purchase", post(purchase))
        .route("/change", post(change_plan))
        .route("/change/pending", get(pending_change_plan))
        .route("/change/confirm", post(confirm_change_plan))
}
