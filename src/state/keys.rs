use serde::{Deserialize, Serialize};

use super::StateKey;
use crate::booking::{BookingDraft, DEFAULT_DURATION_MINUTES};
use crate::catalog::ServiceType;
use crate::models::{Booking, Plan};
use crate::scheduling::ExclusionCache;

/// Session the student wants to move to another time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleIntent {
    pub booking_id: String,
    pub tutor_id: String,
    pub subject: Option<String>,
    pub service_type: Option<ServiceType>,
    pub plan_id: Option<String>,
    pub duration_minutes: u32,
    /// What the original session cost, in cents.
    pub price_cents: Option<i64>,
}

impl RescheduleIntent {
    /// `None` when the session has no tutor to rebook with.
    pub fn from_booking(booking: &Booking) -> Option<Self> {
        let tutor_id = booking.tutor_id.clone()?;
        let duration_minutes = u32::try_from(booking.duration_minutes())
            .ok()
            .filter(|minutes| *minutes > 0)
            .unwrap_or(DEFAULT_DURATION_MINUTES);
        Some(Self {
            booking_id: booking.id.clone(),
            tutor_id,
            subject: booking.subject.clone(),
            service_type: booking.service_type.as_deref().and_then(|s| s.parse().ok()),
            plan_id: booking.plan_id.clone(),
            duration_minutes,
            price_cents: booking.price,
        })
    }
}

/// Plan change waiting on a payment before it can be confirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePlanIntent {
    pub plan_id: String,
    pub plan_name: String,
    pub amount_cents: i64,
    #[serde(default)]
    pub hours: Option<u32>,
}

pub struct ActivePlanKey;

impl StateKey for ActivePlanKey {
    const NAME: &'static str = "activePlan";
    type Value = Plan;
}

pub struct PendingBookingKey;

impl StateKey for PendingBookingKey {
    const NAME: &'static str = "pendingBooking";
    type Value = BookingDraft;
}

pub struct RecentlyBookedSlotsKey;

impl StateKey for RecentlyBookedSlotsKey {
    const NAME: &'static str = "recentlyBookedSlots";
    type Value = ExclusionCache;
}

pub struct SelectedServiceKey;

impl StateKey for SelectedServiceKey {
    const NAME: &'static str = "selectedService";
    type Value = ServiceType;
}

pub struct RescheduleIntentKey;

impl StateKey for RescheduleIntentKey {
    const NAME: &'static str = "rescheduleIntent";
    type Value = RescheduleIntent;
}

pub struct ChangePlanIntentKey;

impl StateKey for ChangePlanIntentKey {
    const NAME: &'static str = "changePlanIntent";
    type Value = ChangePlanIntent;
}
