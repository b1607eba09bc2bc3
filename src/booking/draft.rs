use serde::{Deserialize, Serialize};

use crate::catalog::ServiceType;
use crate::models::Provider;

/// Wizard stages, in order. Navigation is by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WizardStep {
    #[default]
    Service,
    Plan,
    Subject,
    Provider,
    #[serde(rename = "datetime")]
    DateTime,
    Details,
    Confirm,
}

impl WizardStep {
    pub const ALL: [WizardStep; 7] = [
        WizardStep::Service,
        WizardStep::Plan,
        WizardStep::Subject,
        WizardStep::Provider,
        WizardStep::DateTime,
        WizardStep::Details,
        WizardStep::Confirm,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn next(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    pub fn title(self) -> &'static str {
        match self {
            WizardStep::Service => "Choose a service",
            WizardStep::Plan => "Choose a plan",
            WizardStep::Subject => "Choose a subject",
            WizardStep::Provider => "Choose a tutor",
            WizardStep::DateTime => "Pick a date and time",
            WizardStep::Details => "Session details",
            WizardStep::Confirm => "Review and confirm",
        }
    }
}

/// Selections accumulated by the booking wizard, submitted as one booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDraft {
    pub step: WizardStep,
    pub service_type: Option<ServiceType>,
    pub plan_id: Option<String>,
    pub hours: Option<u32>,
    pub subject: Option<String>,
    pub provider_id: Option<String>,
    /// Providers fetched when the subject step was left.
    #[serde(default)]
    pub providers: Vec<Provider>,
    /// `YYYY-MM-DD`
    pub date: Option<String>,
    /// `HH:mm`
    pub time_value: Option<String>,
    pub availability_id: Option<String>,
    #[serde(rename = "startTimeISO")]
    pub start_time_iso: Option<String>,
    #[serde(rename = "endTimeISO")]
    pub end_time_iso: Option<String>,
    pub duration_minutes: u32,
    pub notes: Option<String>,
    /// Session being moved, cancelled once the new one is booked.
    #[serde(default)]
    pub reschedule_of: Option<String>,
    /// Price carried over from a rescheduled session, in cents.
    #[serde(default)]
    pub carried_price_cents: Option<i64>,
    /// Booking created upstream but still awaiting payment.
    #[serde(default)]
    pub pending_booking_id: Option<String>,
}

impl Default for BookingDraft {
    fn default() -> Self {
        Self {
            step: WizardStep::Service,
            service_type: None,
            plan_id: None,
            hours: None,
            subject: None,
            provider_id: None,
            providers: Vec::new(),
            date: None,
            time_value: None,
            availability_id: None,
            start_time_iso: None,
            end_time_iso: None,
            duration_minutes: DEFAULT_DURATION_MINUTES,
            notes: None,
            reschedule_of: None,
            carried_price_cents: None,
            pending_booking_id: None,
        }
    }
}

pub const DEFAULT_DURATION_MINUTES: u32 = 60;

impl BookingDraft {
    pub(crate) fn clear_time(&mut self) {
        self.date = None;
        self.time_value = None;
        self.availability_id = None;
        self.start_time_iso = None;
        self.end_time_iso = None;
        self.pending_booking_id = None;
    }

    pub(crate) fn clear_provider(&mut self) {
        self.provider_id = None;
        self.clear_time();
    }

    pub(crate) fn clear_subject(&mut self) {
        self.subject = None;
        self.providers.clear();
        self.clear_provider();
    }

    pub(crate) fn clear_plan(&mut self) {
        self.plan_id = None;
        self.hours = None;
        self.clear_subject();
    }

    pub fn is_reschedule(&self) -> bool {
        self.reschedule_of.is_some()
    }
}
