use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::info;
use validator::Validate;

use crate::api::{AuthToken, Marketplace};
use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{Booking, CancelBooking};
use crate::sessions::{ensure_cancellable, session_stats, SessionList, SessionStats};
use crate::state::{ClientState, RescheduleIntent, RescheduleIntentKey};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOverview {
    pub sessions: SessionList,
    pub stats: SessionStats,
}

/// One fetch of the student's bookings, bucketed and summarized.
pub(crate) async fn load_overview(api: &dyn Marketplace, token: &AuthToken) -> AppResult<SessionOverview> {
    let bookings = api.my_bookings(token).await?;
    let now = OffsetDateTime::now_utc();
    let stats = session_stats(&bookings, now);
    Ok(SessionOverview {
        sessions: SessionList::from_bookings(bookings, now),
        stats,
    })
}

async fn find_booking(api: &dyn Marketplace, token: &AuthToken, id: &str) -> AppResult<Booking> {
    api.my_bookings(token)
        .await?
        .into_iter()
        .find(|booking| booking.id == id)
        .ok_or_else(|| AppError::NotFound(format!("Session {id}")))
}

pub async fn list_sessions(State(state): State<AppState>, token: AuthToken) -> AppResult<Json<SessionOverview>> {
    Ok(Json(load_overview(state.api.as_ref(), &token).await?))
}

pub async fn stats(State(state): State<AppState>, token: AuthToken) -> AppResult<Json<SessionStats>> {
    let bookings = state.api.my_bookings(&token).await?;
    Ok(Json(session_stats(&bookings, OffsetDateTime::now_utc())))
}

pub async fn cancel_session(
    State(state): State<AppState>,
    token: AuthToken,
    Path(id): Path<String>,
    Json(payload): Json<CancelBooking>,
) -> AppResult<Json<Booking>> {
    payload.validate()?;
    let booking = find_booking(state.api.as_ref(), &token, &id).await?;
    ensure_cancellable(&booking, OffsetDateTime::now_utc())?;

    let request = CancelBooking {
        reason: payload
            .reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty()),
    };
    let cancelled = state.api.cancel_booking(&token, &id, &request).await?;
    info!(booking_id = %id, "Session cancelled");
    Ok(Json(cancelled))
}

/// Park a reschedule intent; the booking flow picks it up with `mode: reschedule`.
pub async fn reschedule_session(
    State(state): State<AppState>,
    token: AuthToken,
    client: ClientState,
    Path(id): Path<String>,
) -> AppResult<Json<RescheduleIntent>> {
    let booking = find_booking(state.api.as_ref(), &token, &id).await?;
    ensure_cancellable(&booking, OffsetDateTime::now_utc())?;
    let intent = RescheduleIntent::from_booking(&booking)
        .ok_or_else(|| AppError::BadRequest("This session has no tutor to reschedule with".to_string()))?;
    client.put::<RescheduleIntentKey>(&intent).await?;
    info!(booking_id = %id, "Reschedule requested");
    Ok(Json(intent))
}
