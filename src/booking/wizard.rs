use serde::Serialize;
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, Time};
use tracing::{debug, info, instrument, warn};

use super::conflict::is_slot_conflict;
use super::draft::{BookingDraft, WizardStep};
use crate::api::{ApiError, AuthToken, Marketplace};
use crate::catalog::{format_cents, subjects, ServiceType};
use crate::models::{
    validate_processor_token, Booking, CancelBooking, ChangePlanRequest, NewBooking, Plan,
    PlanSource, PlanType, ProviderFilter, PurchasePlanRequest,
};
use crate::pricing::{quote_plan, PlanSelection, PricingError, Quote};
use crate::retry::{with_retry, RetryPolicy};
use crate::scheduling::{iso_date, parse_clock, CandidateTimeSlot, ExclusionCache, RecentlyBookedSlot};
use crate::state::RescheduleIntent;

/// Where counseling bookings continue.
pub const COUNSELOR_FLOW_PATH: &str = "/counseling/book";
pub const MAX_NOTES_LEN: usize = 1000;
const CONFLICT_MESSAGE: &str =
    "That time was just booked by someone else. Please pick another time slot and try again.";

#[derive(Debug, Error)]
pub enum WizardError {
    #[error("{reason}")]
    Incomplete { step: WizardStep, reason: &'static str },

    #[error("The {0:?} step has not been reached yet")]
    NotReached(WizardStep),

    #[error("Already at the last step")]
    AtLastStep,

    #[error("{0}")]
    InvalidSelection(String),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Upstream(#[from] ApiError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Advance {
    Moved { step: WizardStep },
    /// The flow continues outside the wizard.
    Redirect { location: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPrompt {
    pub booking_id: Option<String>,
    pub plan_id: Option<String>,
    pub amount_cents: i64,
    pub amount_label: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Submission {
    Booked { booking: Booking },
    PaymentRequired { payment: PaymentPrompt },
    /// The slot was taken; the wizard is back at the date and time step.
    Conflict { message: String, step: WizardStep },
    /// Payment settled a booking that already existed upstream.
    Paid { booking_id: String },
}

/// The seven-step booking flow over a [`BookingDraft`].
#[derive(Debug, Clone, Default)]
pub struct BookingWizard {
    pub draft: BookingDraft,
    pub active_plan: Option<Plan>,
}

impl BookingWizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resume(draft: Option<BookingDraft>, active_plan: Option<Plan>) -> Self {
        let mut draft = draft.unwrap_or_default();
        if let Some(plan) = &active_plan {
            draft.plan_id.get_or_insert_with(|| plan.id.clone());
        }
        Self { draft, active_plan }
    }

    /// Start at the date and time step with everything else taken from the session being moved.
    pub fn reschedule(intent: &RescheduleIntent) -> Self {
        let draft = BookingDraft {
            step: WizardStep::DateTime,
            service_type: Some(intent.service_type.unwrap_or(ServiceType::Tutoring)),
            plan_id: intent.plan_id.clone(),
            subject: intent.subject.clone(),
            provider_id: Some(intent.tutor_id.clone()),
            duration_minutes: intent.duration_minutes,
            reschedule_of: Some(intent.booking_id.clone()),
            carried_price_cents: intent.price_cents,
            ..BookingDraft::default()
        };
        Self {
            draft,
            active_plan: None,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.draft.step
    }

    pub fn select_service(&mut self, service: ServiceType) {
        if self.draft.service_type != Some(service) {
            self.draft.clear_subject();
            let plan_mismatch = self
                .active_plan
                .as_ref()
                .and_then(|plan| plan.service_type)
                .is_some_and(|planned| planned != service);
            if plan_mismatch {
                self.draft.clear_plan();
                self.active_plan = None;
            }
        }
        self.draft.service_type = Some(service);
    }

    pub fn select_plan(&mut self, plan: Plan, hours: Option<u32>) -> Result<Quote, WizardError> {
        let hours = hours.filter(|_| plan.plan_type == PlanType::MultiHour);
        let quote = quote_plan(
            &plan,
            PlanSelection {
                hours,
                duration_minutes: None,
            },
        )?;
        if self.draft.plan_id.as_deref() != Some(plan.id.as_str()) {
            self.draft.clear_time();
        }
        self.draft.plan_id = Some(plan.id.clone());
        self.draft.hours = hours;
        if plan.duration > 0 {
            self.draft.duration_minutes = plan.duration;
        }
        self.active_plan = Some(plan);
        Ok(quote)
    }

    pub fn select_subject(&mut self, subject: &str) -> Result<(), WizardError> {
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(WizardError::InvalidSelection("Subject must not be empty".to_string()));
        }
        // Catalog subjects are stored under their display name; free text passes through.
        let subject = subjects::find(subject).map_or(subject, |known| known.name);
        if self.draft.subject.as_deref() != Some(subject) {
            self.draft.clear_subject();
        }
        self.draft.subject = Some(subject.to_string());
        Ok(())
    }

    pub fn select_provider(&mut self, provider_id: &str) -> Result<(), WizardError> {
        let known = self.draft.providers.is_empty()
            || self.draft.providers.iter().any(|p| p.id == provider_id);
        if !known {
            return Err(WizardError::InvalidSelection(format!(
                "Tutor {provider_id} does not teach this subject"
            )));
        }
        if self.draft.provider_id.as_deref() != Some(provider_id) {
            self.draft.clear_provider();
        }
        self.draft.provider_id = Some(provider_id.to_string());
        Ok(())
    }

    pub fn select_duration(&mut self, minutes: u32) -> Result<(), WizardError> {
        if !(15..=240).contains(&minutes) || minutes % 15 != 0 {
            return Err(WizardError::InvalidSelection(
                "Duration must be a multiple of 15 minutes between 15 and 240".to_string(),
            ));
        }
        if self.draft.duration_minutes != minutes {
            self.draft.clear_time();
        }
        self.draft.duration_minutes = minutes;
        Ok(())
    }

    /// `candidates` must be the freshly computed options for `date`.
    pub fn select_time(
        &mut self,
        date: Date,
        value: &str,
        candidates: &[CandidateTimeSlot],
    ) -> Result<(), WizardError> {
        let candidate = candidates
            .iter()
            .find(|c| c.value == value)
            .ok_or_else(|| WizardError::InvalidSelection(format!("{value} is not an available start time")))?;
        let (start, end) = session_bounds(date, value, self.draft.duration_minutes)?;
        self.draft.date = Some(iso_date(date));
        self.draft.time_value = Some(candidate.value.clone());
        self.draft.availability_id = Some(candidate.availability_id.clone());
        self.draft.start_time_iso = Some(start);
        self.draft.end_time_iso = Some(end);
        Ok(())
    }

    pub fn set_notes(&mut self, notes: Option<String>) -> Result<(), WizardError> {
        let notes = notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        if notes.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTES_LEN) {
            return Err(WizardError::InvalidSelection(format!(
                "Notes must be at most {MAX_NOTES_LEN} characters"
            )));
        }
        self.draft.notes = notes;
        Ok(())
    }

    /// Completeness predicate for leaving `step`.
    pub fn gate(&self, step: WizardStep) -> Result<(), WizardError> {
        let draft = &self.draft;
        let incomplete = |reason| Err(WizardError::Incomplete { step, reason });
        match step {
            WizardStep::Service => {
                if draft.service_type.is_none() {
                    return incomplete("Select a service");
                }
            }
            WizardStep::Plan => {
                if draft.is_reschedule() {
                    return Ok(());
                }
                let Some(plan) = &self.active_plan else {
                    return incomplete("Select a plan");
                };
                quote_plan(plan, self.selection())?;
            }
            WizardStep::Subject => {
                let missing = draft.subject.as_deref().map_or(true, str::is_empty);
                if missing && !draft.is_reschedule() {
                    return incomplete("Select a subject");
                }
            }
            WizardStep::Provider => {
                if draft.provider_id.is_none() {
                    return incomplete("Select a tutor");
                }
            }
            WizardStep::DateTime => {
                if draft.start_time_iso.is_none() || draft.end_time_iso.is_none() {
                    return incomplete("Select a date and start time");
                }
            }
            WizardStep::Details => {
                if draft.duration_minutes == 0 {
                    return incomplete("Select a session duration");
                }
                if draft.notes.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTES_LEN) {
                    return incomplete("Notes are too long");
                }
            }
            WizardStep::Confirm => {}
        }
        Ok(())
    }

    /// Backward navigation to any step up to the current one.
    pub fn go_back(&mut self, step: WizardStep) -> Result<WizardStep, WizardError> {
        if step > self.draft.step {
            return Err(WizardError::NotReached(step));
        }
        self.draft.step = step;
        Ok(step)
    }

    /// Move forward one step if the current step is complete.
    ///
    /// A rejected gate returns before any upstream call is made.
    #[instrument(skip_all, fields(step = ?self.draft.step))]
    pub async fn advance(&mut self, api: &dyn Marketplace, token: &AuthToken) -> Result<Advance, WizardError> {
        let step = self.draft.step;
        let next = step.next().ok_or(WizardError::AtLastStep)?;

        if step == WizardStep::Plan && self.draft.service_type.is_some_and(|s| s.uses_counselor_flow()) {
            info!("Counseling selected, leaving the booking wizard");
            return Ok(Advance::Redirect {
                location: COUNSELOR_FLOW_PATH.to_string(),
            });
        }

        self.gate(step)?;

        match step {
            WizardStep::Plan => self.activate_plan(api, token).await?,
            WizardStep::Subject => self.fetch_providers(api, token).await?,
            _ => {}
        }

        self.draft.step = next;
        debug!(next = ?next, "Wizard advanced");
        Ok(Advance::Moved { step: next })
    }

    async fn activate_plan(&self, api: &dyn Marketplace, token: &AuthToken) -> Result<(), WizardError> {
        let Some(plan) = &self.active_plan else {
            return Ok(());
        };
        if plan.source == PlanSource::Fallback {
            debug!(plan_id = %plan.id, "Fallback plan, skipping activation");
            return Ok(());
        }
        api.change_plan(
            token,
            &ChangePlanRequest {
                plan_id: plan.id.clone(),
            },
        )
        .await?;
        info!(plan_id = %plan.id, "Plan activated");
        Ok(())
    }

    async fn fetch_providers(&mut self, api: &dyn Marketplace, token: &AuthToken) -> Result<(), WizardError> {
        let filter = ProviderFilter {
            subject: self.draft.subject.clone(),
            service_type: self.draft.service_type.map(|s| s.code().to_string()),
        };
        let providers = api.tutors(token, &filter).await?;
        info!(count = providers.len(), "Fetched tutors for subject");
        if let Some(selected) = &self.draft.provider_id {
            if !providers.iter().any(|p| &p.id == selected) {
                self.draft.clear_provider();
            }
        }
        self.draft.providers = providers;
        Ok(())
    }

    fn selection(&self) -> PlanSelection {
        PlanSelection {
            hours: self.draft.hours,
            duration_minutes: Some(self.draft.duration_minutes),
        }
    }

    /// Amount charged for the draft, in cents.
    pub fn price_cents(&self) -> Result<i64, WizardError> {
        if let Some(plan) = &self.active_plan {
            return Ok(quote_plan(plan, self.selection())?.final_cents());
        }
        self.draft.carried_price_cents.ok_or(WizardError::Incomplete {
            step: WizardStep::Plan,
            reason: "Select a plan",
        })
    }

    pub fn booking_payload(&self) -> Result<NewBooking, WizardError> {
        for step in &WizardStep::ALL[..WizardStep::Confirm.index()] {
            self.gate(*step)?;
        }
        let draft = &self.draft;
        let missing = |step, reason| WizardError::Incomplete { step, reason };
        Ok(NewBooking {
            tutor_id: draft
                .provider_id
                .clone()
                .ok_or(missing(WizardStep::Provider, "Select a tutor"))?,
            subject: draft.subject.clone().unwrap_or_default(),
            service_type: draft
                .service_type
                .ok_or(missing(WizardStep::Service, "Select a service"))?
                .code()
                .to_string(),
            start_time: draft
                .start_time_iso
                .clone()
                .ok_or(missing(WizardStep::DateTime, "Select a date and start time"))?,
            end_time: draft
                .end_time_iso
                .clone()
                .ok_or(missing(WizardStep::DateTime, "Select a date and start time"))?,
            duration: draft.duration_minutes,
            notes: draft.notes.clone(),
            plan_id: draft.plan_id.clone(),
            price: self.price_cents()?,
        })
    }

    fn attempted_slot(&self) -> Option<RecentlyBookedSlot> {
        let draft = &self.draft;
        Some(RecentlyBookedSlot::new(
            draft.provider_id.clone()?,
            draft.date.clone()?,
            draft.time_value.clone()?,
        ))
    }

    fn remember_slot(&self, exclusion: &mut ExclusionCache) {
        if let Some(slot) = self.attempted_slot() {
            exclusion.insert(slot);
        }
    }

    fn payment_prompt(&self, booking_id: Option<String>, amount_cents: i64, message: String) -> PaymentPrompt {
        PaymentPrompt {
            booking_id,
            plan_id: self.draft.plan_id.clone(),
            amount_cents,
            amount_label: format_cents(amount_cents),
            message,
        }
    }

    /// Submit the booking from the confirm step.
    #[instrument(skip_all, fields(tutor_id = ?self.draft.provider_id, start = ?self.draft.start_time_iso))]
    pub async fn submit(
        &mut self,
        api: &dyn Marketplace,
        token: &AuthToken,
        retry: &RetryPolicy,
        exclusion: &mut ExclusionCache,
    ) -> Result<Submission, WizardError> {
        if self.draft.step != WizardStep::Confirm {
            return Err(WizardError::NotReached(WizardStep::Confirm));
        }
        let payload = self.booking_payload()?;

        match with_retry(retry, || api.create_booking(token, &payload)).await {
            Ok(booking) if booking.is_paid == Some(false) => {
                info!(booking_id = %booking.id, "Booking created, awaiting payment");
                self.draft.pending_booking_id = Some(booking.id.clone());
                let prompt = self.payment_prompt(
                    Some(booking.id),
                    payload.price,
                    "Payment is required to confirm this session".to_string(),
                );
                Ok(Submission::PaymentRequired { payment: prompt })
            }
            Ok(booking) => {
                info!(booking_id = %booking.id, "Booking confirmed");
                self.remember_slot(exclusion);
                self.finish_reschedule(api, token).await;
                Ok(Submission::Booked { booking })
            }
            Err(ApiError::PaymentRequired { message, .. }) => {
                let prompt = self.payment_prompt(None, payload.price, message);
                Ok(Submission::PaymentRequired { payment: prompt })
            }
            Err(err) if is_slot_conflict(&err) => {
                warn!(error = %err, "Slot taken, returning to date and time selection");
                self.remember_slot(exclusion);
                self.draft.clear_time();
                self.draft.step = WizardStep::DateTime;
                Ok(Submission::Conflict {
                    message: CONFLICT_MESSAGE.to_string(),
                    step: WizardStep::DateTime,
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Pay for the selected plan with a processor payment method, then finish the booking.
    #[instrument(skip_all, fields(plan_id = ?self.draft.plan_id))]
    pub async fn pay(
        &mut self,
        api: &dyn Marketplace,
        token: &AuthToken,
        retry: &RetryPolicy,
        exclusion: &mut ExclusionCache,
        payment_method_id: &str,
    ) -> Result<Submission, WizardError> {
        validate_processor_token(payment_method_id).map_err(|_| {
            WizardError::InvalidSelection("A saved card or processor payment method is required".to_string())
        })?;
        let plan_id = self
            .active_plan
            .as_ref()
            .map(|plan| plan.id.clone())
            .ok_or(WizardError::Incomplete {
                step: WizardStep::Plan,
                reason: "Select a plan",
            })?;

        let request = PurchasePlanRequest {
            plan_id,
            payment_method_id: payment_method_id.to_string(),
            amount: self.price_cents()?,
            hours: self.draft.hours,
            booking_id: self.draft.pending_booking_id.clone(),
        };
        api.purchase_plan(token, &request).await?;
        info!(amount = request.amount, "Plan purchased");

        match self.draft.pending_booking_id.take() {
            Some(booking_id) => {
                self.remember_slot(exclusion);
                self.finish_reschedule(api, token).await;
                Ok(Submission::Paid { booking_id })
            }
            None => self.submit(api, token, retry, exclusion).await,
        }
    }

    /// Cancel the session this booking replaced. The new booking stands either way.
    async fn finish_reschedule(&mut self, api: &dyn Marketplace, token: &AuthToken) {
        let Some(original) = self.draft.reschedule_of.take() else {
            return;
        };
        let request = CancelBooking {
            reason: Some("Rescheduled".to_string()),
        };
        match api.cancel_booking(token, &original, &request).await {
            Ok(_) => info!(booking_id = %original, "Original session cancelled after reschedule"),
            Err(e) => warn!(booking_id = %original, error = %e, "Failed to cancel rescheduled session"),
        }
    }
}

fn session_bounds(date: Date, value: &str, duration_minutes: u32) -> Result<(String, String), WizardError> {
    let minutes = parse_clock(value)
        .ok_or_else(|| WizardError::InvalidSelection(format!("Invalid start time {value}")))?;
    let time = Time::from_hms((minutes / 60) as u8, (minutes % 60) as u8, 0)
        .map_err(|e| WizardError::InvalidSelection(e.to_string()))?;
    let start = PrimitiveDateTime::new(date, time).assume_utc();
    let end = start + Duration::minutes(i64::from(duration_minutes.max(1)));
    Ok((rfc3339(start)?, rfc3339(end)?))
}

fn rfc3339(at: OffsetDateTime) -> Result<String, WizardError> {
    at.format(&Rfc3339)
        .map_err(|e| WizardError::InvalidSelection(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeMarketplace;
    use crate::models::{BookingStatus, Provider};
    use serde_json::json;
    use std::time::Duration as StdDuration;
    use time::macros::{date, datetime};

    fn token() -> AuthToken {
        AuthToken::new("jwt")
    }

    fn retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_backoff: StdDuration::from_millis(1),
        }
    }

    fn plan(id: &str, plan_type: PlanType, price: f64, source: PlanSource) -> Plan {
        Plan {
            id: id.to_string(),
            name: "Plan".to_string(),
            plan_type,
            price,
            calculated_price: None,
            session_count: None,
            duration: 60,
            discount: 0.0,
            discount_percentage: 0.0,
            min_hours: Some(1),
            max_hours: Some(20),
            service_type: None,
            is_active: true,
            source,
        }
    }

    fn candidate(value: &str) -> CandidateTimeSlot {
        CandidateTimeSlot {
            label: value.to_string(),
            value: value.to_string(),
            availability_id: "a1".to_string(),
        }
    }

    fn booking(id: &str, is_paid: Option<bool>) -> Booking {
        Booking {
            id: id.to_string(),
            tutor_id: Some("t1".to_string()),
            tutor_name: None,
            subject: Some("math".to_string()),
            service_type: Some("tutoring".to_string()),
            start_time: datetime!(2026-10-20 10:00 UTC),
            end_time: datetime!(2026-10-20 11:00 UTC),
            duration: Some(60),
            status: BookingStatus::Confirmed,
            is_paid,
            price: Some(6000),
            notes: None,
            plan_id: Some("single".to_string()),
        }
    }

    /// A wizard that passed every gate and sits at the confirm step.
    fn ready_wizard() -> BookingWizard {
        let mut wizard = BookingWizard::new();
        wizard.select_service(ServiceType::Tutoring);
        wizard
            .select_plan(plan("single", PlanType::Single, 60.0, PlanSource::Catalog), None)
            .unwrap();
        wizard.select_subject("math").unwrap();
        wizard.select_provider("t1").unwrap();
        wizard
            .select_time(date!(2026 - 10 - 20), "10:00", &[candidate("10:00")])
            .unwrap();
        wizard.draft.step = WizardStep::Confirm;
        wizard
    }

    #[test]
    fn catalog_subjects_are_stored_by_name() {
        let mut wizard = BookingWizard::new();
        wizard.select_subject(" calculus ").unwrap();
        assert_eq!(wizard.draft.subject.as_deref(), Some("Calculus"));

        wizard.select_subject("Robotics club").unwrap();
        assert_eq!(wizard.draft.subject.as_deref(), Some("Robotics club"));
        assert!(wizard.select_subject("   ").is_err());
    }

    #[tokio::test]
    async fn datetime_gate_rejects_without_an_upstream_call() {
        let api = FakeMarketplace::default();
        let mut wizard = ready_wizard();
        wizard.draft.step = WizardStep::DateTime;
        wizard.draft.start_time_iso = None;

        let err = wizard.advance(&api, &token()).await.unwrap_err();

        assert!(matches!(err, WizardError::Incomplete { step: WizardStep::DateTime, .. }));
        assert_eq!(wizard.step(), WizardStep::DateTime);
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn leaving_plan_activates_catalog_plans_only() {
        let api = FakeMarketplace::default();
        let mut wizard = BookingWizard::new();
        wizard.select_service(ServiceType::Tutoring);
        wizard.draft.step = WizardStep::Plan;
        wizard
            .select_plan(plan("monthly", PlanType::Monthly, 299.0, PlanSource::Catalog), None)
            .unwrap();

        let moved = wizard.advance(&api, &token()).await.unwrap();
        assert_eq!(moved, Advance::Moved { step: WizardStep::Subject });
        assert_eq!(api.calls(), vec!["change_plan:monthly"]);

        let api = FakeMarketplace::default();
        wizard.go_back(WizardStep::Plan).unwrap();
        wizard
            .select_plan(plan("fallback-single", PlanType::Single, 74.99, PlanSource::Fallback), None)
            .unwrap();
        wizard.advance(&api, &token()).await.unwrap();
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_activation_blocks_the_transition() {
        let api = FakeMarketplace::default();
        api.push_change_plan_result(Err(ApiError::Status {
            status: 500,
            message: "boom".to_string(),
        }));
        let mut wizard = BookingWizard::new();
        wizard.select_service(ServiceType::Tutoring);
        wizard.draft.step = WizardStep::Plan;
        wizard
            .select_plan(plan("monthly", PlanType::Monthly, 299.0, PlanSource::Catalog), None)
            .unwrap();

        let err = wizard.advance(&api, &token()).await.unwrap_err();
        assert!(matches!(err, WizardError::Upstream(_)));
        assert_eq!(wizard.step(), WizardStep::Plan);
    }

    #[tokio::test]
    async fn counseling_redirects_out_of_the_wizard() {
        let api = FakeMarketplace::default();
        let mut wizard = BookingWizard::new();
        wizard.select_service(ServiceType::Counseling);
        wizard.advance(&api, &token()).await.unwrap();

        let outcome = wizard.advance(&api, &token()).await.unwrap();
        assert_eq!(
            outcome,
            Advance::Redirect {
                location: COUNSELOR_FLOW_PATH.to_string()
            }
        );
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn leaving_subject_fetches_matching_tutors() {
        let api = FakeMarketplace {
            tutors: vec![Provider {
                id: "t1".to_string(),
                name: "Ada".to_string(),
                subjects: vec!["math".to_string()],
                service_types: vec!["tutoring".to_string()],
                hourly_rate: Some(60.0),
                rating: None,
                bio: None,
            }],
            ..FakeMarketplace::default()
        };
        let mut wizard = BookingWizard::new();
        wizard.select_service(ServiceType::TestPrep);
        wizard.select_subject("math").unwrap();
        wizard.draft.step = WizardStep::Subject;

        wizard.advance(&api, &token()).await.unwrap();

        assert_eq!(wizard.step(), WizardStep::Provider);
        assert_eq!(api.calls(), vec!["tutors:math:test_prep"]);
        assert_eq!(wizard.draft.providers.len(), 1);
        assert!(wizard.select_provider("t9").is_err());
    }

    #[test]
    fn cannot_jump_forward_with_go_back() {
        let mut wizard = BookingWizard::new();
        wizard.draft.step = WizardStep::Subject;
        assert!(matches!(
            wizard.go_back(WizardStep::Details),
            Err(WizardError::NotReached(WizardStep::Details))
        ));
        assert_eq!(wizard.go_back(WizardStep::Service).unwrap(), WizardStep::Service);
    }

    #[test]
    fn selected_time_resolves_iso_bounds() {
        let mut wizard = BookingWizard::new();
        wizard.select_duration(90).unwrap();
        wizard
            .select_time(date!(2026 - 10 - 20), "23:00", &[candidate("23:00")])
            .unwrap();
        assert_eq!(wizard.draft.start_time_iso.as_deref(), Some("2026-10-20T23:00:00Z"));
        assert_eq!(wizard.draft.end_time_iso.as_deref(), Some("2026-10-21T00:30:00Z"));
        assert!(wizard
            .select_time(date!(2026 - 10 - 20), "09:00", &[candidate("23:00")])
            .is_err());
    }

    #[tokio::test]
    async fn booking_the_same_slot_again_hides_it() {
        let api = FakeMarketplace::default();
        api.push_booking_result(Ok(booking("b1", Some(true))));
        let mut exclusion = ExclusionCache::default();
        let mut wizard = ready_wizard();

        let outcome = wizard.submit(&api, &token(), &retry(), &mut exclusion).await.unwrap();
        assert!(matches!(outcome, Submission::Booked { .. }));

        let submitted = api.submitted.lock().unwrap().clone();
        assert_eq!(submitted[0].price, 6000);
        assert_eq!(submitted[0].start_time, "2026-10-20T10:00:00Z");

        let offered = exclusion.retain_available("t1", date!(2026 - 10 - 20), vec![candidate("10:00"), candidate("10:30")]);
        assert_eq!(offered, vec![candidate("10:30")]);
        assert!(!exclusion.insert(RecentlyBookedSlot::new("t1", "2026-10-20", "10:00")));
    }

    #[tokio::test]
    async fn conflict_rewinds_to_datetime_and_excludes_the_slot() {
        let api = FakeMarketplace::default();
        api.push_booking_result(Err(ApiError::Rejected {
            status: 409,
            message: "Slot already booked".to_string(),
        }));
        let mut exclusion = ExclusionCache::default();
        let mut wizard = ready_wizard();

        let outcome = wizard.submit(&api, &token(), &retry(), &mut exclusion).await.unwrap();

        assert!(matches!(outcome, Submission::Conflict { step: WizardStep::DateTime, .. }));
        assert_eq!(wizard.step(), WizardStep::DateTime);
        assert!(wizard.draft.start_time_iso.is_none());
        assert!(exclusion.contains("t1", "2026-10-20", "10:00"));
        assert_eq!(api.calls(), vec!["create_booking"]);
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let api = FakeMarketplace::default();
        api.push_booking_result(Err(ApiError::Status {
            status: 503,
            message: "unavailable".to_string(),
        }));
        api.push_booking_result(Ok(booking("b1", None)));
        let mut exclusion = ExclusionCache::default();
        let mut wizard = ready_wizard();

        let outcome = wizard.submit(&api, &token(), &retry(), &mut exclusion).await.unwrap();

        assert!(matches!(outcome, Submission::Booked { .. }));
        assert_eq!(api.calls(), vec!["create_booking", "create_booking"]);
    }

    #[tokio::test]
    async fn outage_after_retries_keeps_the_slot_offered() {
        let api = FakeMarketplace::default();
        for _ in 0..3 {
            api.push_booking_result(Err(ApiError::Status {
                status: 503,
                message: "Service not available".to_string(),
            }));
        }
        let mut exclusion = ExclusionCache::default();
        let mut wizard = ready_wizard();

        let result = wizard.submit(&api, &token(), &retry(), &mut exclusion).await;

        assert!(result.is_err());
        assert_eq!(wizard.step(), WizardStep::Confirm);
        assert!(wizard.draft.start_time_iso.is_some());
        assert!(exclusion.is_empty());
        assert_eq!(api.calls().len(), 3);
    }

    #[tokio::test]
    async fn payment_required_then_paid_resubmits() {
        let api = FakeMarketplace::default();
        api.push_booking_result(Err(ApiError::PaymentRequired {
            message: "No active plan".to_string(),
            details: json!({}),
        }));
        api.push_booking_result(Ok(booking("b2", Some(true))));
        let mut exclusion = ExclusionCache::default();
        let mut wizard = ready_wizard();

        let outcome = wizard.submit(&api, &token(), &retry(), &mut exclusion).await.unwrap();
        let Submission::PaymentRequired { payment } = outcome else {
            panic!("expected payment prompt, got {outcome:?}");
        };
        assert_eq!(payment.amount_cents, 6000);
        assert_eq!(payment.booking_id, None);

        assert!(wizard
            .pay(&api, &token(), &retry(), &mut exclusion, "4242424242424242")
            .await
            .is_err());

        let outcome = wizard
            .pay(&api, &token(), &retry(), &mut exclusion, "pm_card_visa")
            .await
            .unwrap();
        assert!(matches!(outcome, Submission::Booked { .. }));
        assert_eq!(api.purchases.lock().unwrap()[0].amount, 6000);
        assert_eq!(
            api.calls(),
            vec!["create_booking", "purchase_plan:single", "create_booking"]
        );
    }

    #[tokio::test]
    async fn unpaid_booking_is_settled_without_resubmitting() {
        let api = FakeMarketplace::default();
        api.push_booking_result(Ok(booking("b3", Some(false))));
        let mut exclusion = ExclusionCache::default();
        let mut wizard = ready_wizard();

        let outcome = wizard.submit(&api, &token(), &retry(), &mut exclusion).await.unwrap();
        assert!(matches!(outcome, Submission::PaymentRequired { .. }));

        let outcome = wizard
            .pay(&api, &token(), &retry(), &mut exclusion, "pm_123")
            .await
            .unwrap();
        assert_eq!(
            outcome,
            Submission::Paid {
                booking_id: "b3".to_string()
            }
        );
        assert_eq!(api.purchases.lock().unwrap()[0].booking_id.as_deref(), Some("b3"));
        assert_eq!(exclusion.len(), 1);
    }

    #[tokio::test]
    async fn reschedule_cancels_the_original_after_booking() {
        let original = booking("old", Some(true));
        let api = FakeMarketplace {
            bookings: vec![original.clone()],
            ..FakeMarketplace::default()
        };
        api.push_booking_result(Ok(booking("new", Some(true))));
        let intent = RescheduleIntent::from_booking(&original).unwrap();
        let mut wizard = BookingWizard::reschedule(&intent);
        assert_eq!(wizard.step(), WizardStep::DateTime);

        wizard
            .select_time(date!(2026 - 10 - 27), "10:00", &[candidate("10:00")])
            .unwrap();
        wizard.advance(&api, &token()).await.unwrap();
        wizard.advance(&api, &token()).await.unwrap();
        let mut exclusion = ExclusionCache::default();
        let outcome = wizard.submit(&api, &token(), &retry(), &mut exclusion).await.unwrap();

        assert!(matches!(outcome, Submission::Booked { .. }));
        assert_eq!(api.submitted.lock().unwrap()[0].price, 6000);
        assert_eq!(api.calls(), vec!["create_booking", "cancel_booking:old"]);
    }

    #[tokio::test]
    async fn reschedule_without_a_known_price_is_not_submitted_for_free() {
        let mut original = booking("old", Some(true));
        original.price = None;
        let api = FakeMarketplace::default();
        let intent = RescheduleIntent::from_booking(&original).unwrap();
        let mut wizard = BookingWizard::reschedule(&intent);
        assert_eq!(wizard.draft.carried_price_cents, None);

        wizard
            .select_time(date!(2026 - 10 - 27), "10:00", &[candidate("10:00")])
            .unwrap();
        wizard.advance(&api, &token()).await.unwrap();
        wizard.advance(&api, &token()).await.unwrap();
        let mut exclusion = ExclusionCache::default();
        let result = wizard.submit(&api, &token(), &retry(), &mut exclusion).await;

        assert!(matches!(result, Err(WizardError::Incomplete { step: WizardStep::Plan, .. })));
        assert!(api.calls().is_empty());
    }
}
