use crate::api::ApiError;

/// Phrases the marketplace uses when a slot was taken in the meantime.
const SLOT_TAKEN_PATTERNS: &[&str] = &[
    "already booked",
    "already been booked",
    "slot is no longer available",
    "slot is not available",
    "slot not available",
    "slot taken",
    "slot is taken",
    "time slot conflict",
    "booking conflict",
    "overlaps with an existing booking",
];

fn mentions_slot_taken(message: &str) -> bool {
    let message = message.to_lowercase();
    SLOT_TAKEN_PATTERNS.iter().any(|p| message.contains(p))
}

/// Whether a failed submission means the chosen slot is gone.
///
/// A 409 always counts. Other 4xx rejections and `success: false` replies count
/// only when the message says so; server faults never do.
pub fn is_slot_conflict(err: &ApiError) -> bool {
    match err {
        ApiError::Rejected { status: 409, .. } => true,
        ApiError::Rejected { message, .. } | ApiError::Unsuccessful(message) => mentions_slot_taken(message),
        _ => false,
    }
}
