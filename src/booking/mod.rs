//! The booking wizard: a linear, gated flow from service choice to a
//! submitted booking, with a payment detour and slot-conflict recovery.

mod conflict;
mod draft;
mod wizard;

pub use conflict::is_slot_conflict;
pub use draft::{BookingDraft, WizardStep, DEFAULT_DURATION_MINUTES};
pub use wizard::{
    Advance, BookingWizard, PaymentPrompt, Submission, WizardError, COUNSELOR_FLOW_PATH, MAX_NOTES_LEN,
};
