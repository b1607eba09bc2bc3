use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use tracing::{info, warn};
use validator::Validate;

use crate::api::{parse_availability, ApiError, AuthToken, Marketplace};
use crate::app_state::AppState;
use crate::booking::{Advance, BookingDraft, BookingWizard, Submission, WizardError, WizardStep};
use crate::catalog::{subjects, ServiceType, Subject};
use crate::error::{AppError, AppResult};
use crate::models::{validate_processor_token, AvailabilitySlot, Plan};
use crate::modules::plans::handlers::find_plan;
use crate::pricing::{quote_plan, PlanSelection, Quote};
use crate::scheduling::{
    eligible_dates, iso_date, parse_iso_date, time_slots, CandidateTimeSlot, ExclusionCache,
};
use crate::state::{
    ActivePlanKey, ClientState, PendingBookingKey, RecentlyBookedSlotsKey, RescheduleIntentKey, SelectedServiceKey,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepView {
    pub key: WizardStep,
    pub index: usize,
    pub title: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardView {
    pub step: WizardStep,
    pub step_index: usize,
    pub steps: Vec<StepView>,
    pub draft: BookingDraft,
    pub active_plan: Option<Plan>,
    pub quote: Option<Quote>,
    /// Why the current step cannot be left yet, if it cannot.
    pub blocked_reason: Option<String>,
}

impl From<&BookingWizard> for WizardView {
    fn from(wizard: &BookingWizard) -> Self {
        let quote = wizard.active_plan.as_ref().and_then(|plan| {
            quote_plan(
                plan,
                PlanSelection {
                    hours: wizard.draft.hours,
                    duration_minutes: Some(wizard.draft.duration_minutes),
                },
            )
            .ok()
        });
        let step = wizard.step();
        Self {
            step,
            step_index: step.index(),
            steps: WizardStep::ALL
                .iter()
                .map(|s| StepView {
                    key: *s,
                    index: s.index(),
                    title: s.title(),
                })
                .collect(),
            draft: wizard.draft.clone(),
            active_plan: wizard.active_plan.clone(),
            quote,
            blocked_reason: wizard.gate(step).err().map(|e| e.to_string()),
        }
    }
}

async fn load_wizard(client: &ClientState) -> AppResult<BookingWizard> {
    let draft = client.get::<PendingBookingKey>().await?;
    let active_plan = client.get::<ActivePlanKey>().await?;
    Ok(BookingWizard::resume(draft, active_plan))
}

/// Mirror the draft and the active plan into client state.
async fn save_wizard(client: &ClientState, wizard: &BookingWizard) -> AppResult<()> {
    client.put::<PendingBookingKey>(&wizard.draft).await?;
    match &wizard.active_plan {
        Some(plan) => client.put::<ActivePlanKey>(plan).await?,
        None => client.remove::<ActivePlanKey>().await?,
    }
    Ok(())
}

async fn load_exclusions(client: &ClientState) -> AppResult<ExclusionCache> {
    Ok(client.get::<RecentlyBookedSlotsKey>().await?.unwrap_or_default())
}

async fn fetch_slots(
    api: &dyn Marketplace,
    token: &AuthToken,
    tutor_id: &str,
) -> Result<Vec<AvailabilitySlot>, ApiError> {
    api.tutor_availability(token, tutor_id)
        .await
        .map(parse_availability)
}

fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingOptions {
    pub services: Vec<ServiceOption>,
    pub subjects: Vec<SubjectGroup>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceOption {
    pub key: ServiceType,
    pub label: &'static str,
    pub counselor_flow: bool,
}

#[derive(Debug, Serialize)]
pub struct SubjectGroup {
    pub category: &'static str,
    pub subjects: Vec<&'static Subject>,
}

pub async fn booking_options() -> Json<BookingOptions> {
    let services = ServiceType::all()
        .iter()
        .map(|s| ServiceOption {
            key: *s,
            label: s.label(),
            counselor_flow: s.uses_counselor_flow(),
        })
        .collect();
    let subjects = subjects::grouped()
        .into_iter()
        .map(|(category, subjects)| SubjectGroup { category, subjects })
        .collect();
    Json(BookingOptions { services, subjects })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryMode {
    /// Direct navigation: previous progress is discarded.
    #[default]
    Fresh,
    Resume,
    Reschedule,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartBooking {
    #[serde(default)]
    pub mode: EntryMode,
}

pub async fn start_booking(client: ClientState, Json(payload): Json<StartBooking>) -> AppResult<Json<WizardView>> {
    let wizard = match payload.mode {
        EntryMode::Fresh => {
            client.remove::<PendingBookingKey>().await?;
            client.remove::<ActivePlanKey>().await?;
            let mut wizard = BookingWizard::new();
            if let Some(service) = client.get::<SelectedServiceKey>().await? {
                wizard.select_service(service);
                client.remove::<SelectedServiceKey>().await?;
            }
            wizard
        }
        EntryMode::Resume => load_wizard(&client).await?,
        EntryMode::Reschedule => {
            let intent = client
                .get::<RescheduleIntentKey>()
                .await?
                .ok_or_else(|| AppError::NotFound("No session selected for rescheduling".to_string()))?;
            client.remove::<RescheduleIntentKey>().await?;
            client.remove::<ActivePlanKey>().await?;
            BookingWizard::reschedule(&intent)
        }
    };
    save_wizard(&client, &wizard).await?;
    info!(mode = ?payload.mode, step = ?wizard.step(), "Booking flow entered");
    Ok(Json(WizardView::from(&wizard)))
}

pub async fn current_booking(client: ClientState) -> AppResult<Json<WizardView>> {
    let wizard = load_wizard(&client).await?;
    Ok(Json(WizardView::from(&wizard)))
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDraft {
    pub service_type: Option<ServiceType>,
    pub plan_id: Option<String>,
    #[validate(range(min = 1, max = 100))]
    pub hours: Option<u32>,
    #[validate(length(min = 1, max = 120))]
    pub subject: Option<String>,
    pub provider_id: Option<String>,
    #[validate(range(min = 15, max = 240))]
    pub duration_minutes: Option<u32>,
    /// `YYYY-MM-DD`, together with `time`.
    pub date: Option<String>,
    /// `HH:mm`
    pub time: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// Apply selections in wizard order so downstream clearing behaves.
pub async fn update_draft(
    State(state): State<AppState>,
    token: AuthToken,
    client: ClientState,
    Json(payload): Json<UpdateDraft>,
) -> AppResult<Json<WizardView>> {
    payload.validate()?;
    let mut wizard = load_wizard(&client).await?;

    if let Some(service) = payload.service_type {
        wizard.select_service(service);
    }
    if let Some(plan_id) = &payload.plan_id {
        let plan = find_plan(state.api.as_ref(), &token, plan_id).await?;
        wizard.select_plan(plan, payload.hours)?;
    } else if let (Some(hours), Some(plan)) = (payload.hours, wizard.active_plan.clone()) {
        wizard.select_plan(plan, Some(hours))?;
    }
    if let Some(subject) = &payload.subject {
        wizard.select_subject(subject)?;
    }
    if let Some(provider_id) = &payload.provider_id {
        wizard.select_provider(provider_id)?;
    }
    if let Some(minutes) = payload.duration_minutes {
        wizard.select_duration(minutes)?;
    }
    match (&payload.date, &payload.time) {
        (Some(date), Some(time)) => {
            let date = parse_iso_date(date).ok_or_else(|| AppError::BadRequest(format!("Invalid date {date}")))?;
            let candidates = candidates_for(&state, &token, &client, &wizard, date).await?;
            wizard.select_time(date, time, &candidates)?;
        }
        (None, None) => {}
        _ => return Err(AppError::BadRequest("Date and time must be chosen together".to_string())),
    }
    if payload.notes.is_some() {
        wizard.set_notes(payload.notes)?;
    }

    save_wizard(&client, &wizard).await?;
    Ok(Json(WizardView::from(&wizard)))
}

async fn candidates_for(
    state: &AppState,
    token: &AuthToken,
    client: &ClientState,
    wizard: &BookingWizard,
    date: Date,
) -> AppResult<Vec<CandidateTimeSlot>> {
    let tutor_id = wizard.draft.provider_id.as_deref().ok_or(WizardError::Incomplete {
        step: WizardStep::Provider,
        reason: "Select a tutor",
    })?;
    let slots = fetch_slots(state.api.as_ref(), token, tutor_id).await?;
    let exclusion = load_exclusions(client).await?;
    let candidates = time_slots(&slots, date, wizard.draft.duration_minutes);
    Ok(exclusion.retain_available(tutor_id, date, candidates))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceView {
    #[serde(flatten)]
    pub outcome: Advance,
    pub wizard: WizardView,
}

pub async fn advance(
    State(state): State<AppState>,
    token: AuthToken,
    client: ClientState,
) -> AppResult<Json<AdvanceView>> {
    let mut wizard = load_wizard(&client).await?;
    let outcome = wizard.advance(state.api.as_ref(), &token).await?;
    save_wizard(&client, &wizard).await?;
    Ok(Json(AdvanceView {
        outcome,
        wizard: WizardView::from(&wizard),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoBack {
    pub step: Option<WizardStep>,
    pub index: Option<usize>,
}

pub async fn go_back(client: ClientState, Json(payload): Json<GoBack>) -> AppResult<Json<WizardView>> {
    let target = payload
        .step
        .or_else(|| payload.index.and_then(WizardStep::from_index))
        .ok_or_else(|| AppError::BadRequest("A step or step index is required".to_string()))?;
    let mut wizard = load_wizard(&client).await?;
    wizard.go_back(target)?;
    save_wizard(&client, &wizard).await?;
    Ok(Json(WizardView::from(&wizard)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatesQuery {
    pub provider_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatesView {
    pub dates: Vec<String>,
    pub degraded: bool,
    /// Set when availability could not be fetched; `dates` is then empty.
    pub error: Option<String>,
}

/// Bookable dates for the selected tutor over the next 30 days.
pub async fn available_dates(
    State(state): State<AppState>,
    token: AuthToken,
    client: ClientState,
    Query(query): Query<DatesQuery>,
) -> AppResult<Json<DatesView>> {
    let tutor_id = match query.provider_id {
        Some(id) => id,
        None => load_wizard(&client)
            .await?
            .draft
            .provider_id
            .ok_or_else(|| AppError::BadRequest("Select a tutor first".to_string()))?,
    };

    let slots = match fetch_slots(state.api.as_ref(), &token, &tutor_id).await {
        Ok(slots) => slots,
        Err(ApiError::Unauthorized) => return Err(ApiError::Unauthorized.into()),
        Err(e) => {
            warn!(tutor_id = %tutor_id, error = %e, "Availability fetch failed");
            return Ok(Json(DatesView {
                dates: Vec::new(),
                degraded: false,
                error: Some(e.user_message()),
            }));
        }
    };

    let scan = eligible_dates(&slots, today());
    Ok(Json(DatesView {
        dates: scan.dates.into_iter().map(iso_date).collect(),
        degraded: scan.degraded,
        error: None,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimesQuery {
    pub date: String,
    pub duration_minutes: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimesView {
    pub date: String,
    pub slots: Vec<CandidateTimeSlot>,
    pub error: Option<String>,
}

/// Start times on one date, minus anything this browser just booked.
pub async fn available_times(
    State(state): State<AppState>,
    token: AuthToken,
    client: ClientState,
    Query(query): Query<TimesQuery>,
) -> AppResult<Json<TimesView>> {
    let date = parse_iso_date(&query.date)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid date {}", query.date)))?;
    let mut wizard = load_wizard(&client).await?;
    if let Some(minutes) = query.duration_minutes {
        wizard.select_duration(minutes)?;
    }

    match candidates_for(&state, &token, &client, &wizard, date).await {
        Ok(slots) => Ok(Json(TimesView {
            date: query.date,
            slots,
            error: None,
        })),
        Err(AppError::Upstream(err)) if !matches!(err, ApiError::Unauthorized) => {
            warn!(error = %err, "Availability fetch failed");
            Ok(Json(TimesView {
                date: query.date,
                slots: Vec::new(),
                error: Some(err.user_message()),
            }))
        }
        Err(e) => Err(e),
    }
}

fn submission_status(submission: &Submission) -> StatusCode {
    match submission {
        Submission::Booked { .. } => StatusCode::CREATED,
        Submission::PaymentRequired { .. } => StatusCode::PAYMENT_REQUIRED,
        Submission::Conflict { .. } => StatusCode::CONFLICT,
        Submission::Paid { .. } => StatusCode::OK,
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionView {
    #[serde(flatten)]
    pub submission: Submission,
    pub wizard: Option<WizardView>,
}

/// Persist what a submission changed and shape the response.
async fn settle(
    client: &ClientState,
    wizard: &BookingWizard,
    exclusion: &ExclusionCache,
    submission: Submission,
) -> AppResult<(StatusCode, Json<SubmissionView>)> {
    client.put::<RecentlyBookedSlotsKey>(exclusion).await?;
    let done = matches!(submission, Submission::Booked { .. } | Submission::Paid { .. });
    let view = if done {
        client.remove::<PendingBookingKey>().await?;
        None
    } else {
        save_wizard(client, wizard).await?;
        Some(WizardView::from(wizard))
    };
    let status = submission_status(&submission);
    Ok((status, Json(SubmissionView { submission, wizard: view })))
}

pub async fn submit(
    State(state): State<AppState>,
    token: AuthToken,
    client: ClientState,
) -> AppResult<(StatusCode, Json<SubmissionView>)> {
    let mut wizard = load_wizard(&client).await?;
    let mut exclusion = load_exclusions(&client).await?;
    let submission = wizard
        .submit(state.api.as_ref(), &token, &state.retry, &mut exclusion)
        .await?;
    settle(&client, &wizard, &exclusion, submission).await
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PayForBooking {
    #[validate(custom(function = "validate_processor_token"))]
    pub payment_method_id: String,
}

pub async fn pay(
    State(state): State<AppState>,
    token: AuthToken,
    client: ClientState,
    Json(payload): Json<PayForBooking>,
) -> AppResult<(StatusCode, Json<SubmissionView>)> {
    payload.validate()?;
    let mut wizard = load_wizard(&client).await?;
    let mut exclusion = load_exclusions(&client).await?;
    let submission = wizard
        .pay(
            state.api.as_ref(),
            &token,
            &state.retry,
            &mut exclusion,
            &payload.payment_method_id,
        )
        .await?;
    settle(&client, &wizard, &exclusion, submission).await
}
