use axum::{routing::get, Router};

use super::handlers::{create_plan, list_all_plans};
use crate::app_state::AppState;

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/plans", get(list_all_plans).post(create_plan))
}
