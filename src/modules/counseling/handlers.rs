use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::info;
use validator::Validate;

use crate::api::AuthToken;
use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{CounselorSession, NewCounselorSession, Provider};

pub async fn list_counselors(State(state): State<AppState>, token: AuthToken) -> AppResult<Json<Vec<Provider>>> {
    Ok(Json(state.api.counselors(&token).await?))
}

pub async fn counselor_sessions(
    State(state): State<AppState>,
    token: AuthToken,
    Path(counselor_id): Path<String>,
) -> AppResult<Json<Vec<CounselorSession>>> {
    let mut sessions = state.api.counselor_sessions(&token, &counselor_id).await?;
    sessions.sort_by_key(|s| s.start_time);
    Ok(Json(sessions))
}

pub async fn book_session(
    State(state): State<AppState>,
    token: AuthToken,
    Json(payload): Json<NewCounselorSession>,
) -> AppResult<(StatusCode, Json<CounselorSession>)> {
    payload.validate()?;
    let start = OffsetDateTime::parse(&payload.start_time, &Rfc3339)
        .map_err(|_| AppError::BadRequest("Start time must be an RFC 3339 timestamp".to_string()))?;
    if start <= OffsetDateTime::now_utc() {
        return Err(AppError::BadRequest("Start time must be in the future".to_string()));
    }

    let session = state.api.book_counselor_session(&token, &payload).await?;
    info!(counselor_id = %payload.counselor_id, session_id = %session.id, "Counseling session booked");
    Ok((StatusCode::CREATED, Json(session)))
}
