use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Session expired or not authorized")]
    Unauthorized,

    #[error("Payment required: {message}")]
    PaymentRequired { message: String, details: Value },

    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Upstream returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("{0}")]
    Unsuccessful(String),

    #[error("Upstream request failed: {0}")]
    Transport(String),

    #[error("Unexpected upstream payload: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized => Some(401),
            ApiError::PaymentRequired { .. } => Some(402),
            ApiError::Rejected { status, .. } | ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::PaymentRequired { message, .. }
            | ApiError::Rejected { message, .. }
            | ApiError::Status { message, .. }
            | ApiError::Unsuccessful(message) => message.clone(),
            other => other.to_string(),
        }
    }

    /// Network failures and transient server errors.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Transport(_) => true,
            ApiError::Status { status, .. } => matches!(status, 500 | 502 | 503 | 504),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}
