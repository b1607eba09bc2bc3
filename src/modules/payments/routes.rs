use axum::{
    routing::{delete, get, put},
    Router,
};

use super::handlers::{
    add_payment_method, billing_history, delete_payment_method, invoice, list_payment_methods,
    set_default_payment_method,
};
use crate::app_state::AppState;

pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/methods", get(list_payment_methods).post(add_payment_method))
        .route("/methods/{id}", delete(delete_payment_method))
        .route("/methods/{id}/default", put(set_default_payment_method))
        .route("/billing", get(billing_history))
        .route("/billing/invoices/{id}", get(invoice))
}
