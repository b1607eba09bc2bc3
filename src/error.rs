use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use thiserror::Error;
use validator::ValidationErrors;

use crate::api::ApiError;
use crate::booking::WizardError;
use crate::sessions::CancelRefused;
use crate::state::StateError;

pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Upstream(#[from] ApiError),

    #[error(transparent)]
    Wizard(#[from] WizardError),

    #[error(transparent)]
    Cancel(#[from] CancelRefused),

    #[error("State store error: {0}")]
    State(#[from] StateError),

    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl AppError {
    fn parts(&self) -> (StatusCode, String, Map<String, Value>) {
        let mut extra = Map::new();
        let (status, message) = match self {
            AppError::Authentication(_) => {
                extra.insert("redirect".into(), json!(LOGIN_PATH));
                (StatusCode::UNAUTHORIZED, "Authentication required".to_string())
            }
            AppError::Validation(errors) => {
                extra.insert("fields".into(), field_messages(errors));
                (StatusCode::UNPROCESSABLE_ENTITY, "Validation error".to_string())
            }
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "Resource not found".to_string()),
            AppError::Conflict(message) => (StatusCode::CONFLICT, message.clone()),
            AppError::Upstream(err) | AppError::Wizard(WizardError::Upstream(err)) => {
                return upstream_parts(err);
            }
            AppError::Wizard(err) => {
                if let WizardError::Incomplete { step, .. } = err {
                    extra.insert("step".into(), json!(step));
                }
                (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
            }
            AppError::Cancel(err) => (StatusCode::CONFLICT, err.to_string()),
            AppError::State(_) | AppError::InternalServerError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal server error occurred".to_string(),
            ),
        };
        (status, message, extra)
    }
}

fn upstream_parts(err: &ApiError) -> (StatusCode, String, Map<String, Value>) {
    let mut extra = Map::new();
    let status = match err {
        ApiError::Unauthorized => {
            extra.insert("redirect".into(), json!(LOGIN_PATH));
            StatusCode::UNAUTHORIZED
        }
        ApiError::PaymentRequired { details, .. } => {
            extra.insert("payment".into(), details.clone());
            StatusCode::PAYMENT_REQUIRED
        }
        ApiError::Rejected { status: 409, .. } => StatusCode::CONFLICT,
        ApiError::Rejected { .. } | ApiError::Unsuccessful(_) => StatusCode::BAD_REQUEST,
        ApiError::Status { status: 404, .. } => StatusCode::NOT_FOUND,
        ApiError::Status { .. } | ApiError::Transport(_) | ApiError::Decode(_) => StatusCode::BAD_GATEWAY,
    };
    (status, err.user_message(), extra)
}

fn field_messages(errors: &ValidationErrors) -> Value {
    let fields: Map<String, Value> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages: Vec<String> = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid {field}"))
                })
                .collect();
            (field.to_string(), json!(messages))
        })
        .collect();
    Value::Object(fields)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, extra) = self.parts();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let mut error = Map::new();
        error.insert("message".into(), json!(message));
        error.insert("details".into(), json!(self.to_string()));
        error.extend(extra);

        (status, Json(json!({ "error": error }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
