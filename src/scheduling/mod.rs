//! Availability slot engine: which dates a tutor can be booked on, and which
//! start times exist on a chosen date.

pub mod dates;
pub mod exclusion;
pub mod slots;

pub use dates::{eligible_dates, fallback_dates, weekday_index, DateScan};
pub use exclusion::{ExclusionCache, RecentlyBookedSlot};
pub use slots::{parse_clock, time_slots, CandidateTimeSlot, STEP_MINUTES};

use time::macros::format_description;
use time::Date;

/// `YYYY-MM-DD`
pub fn iso_date(date: Date) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), u8::from(date.month()), date.day())
}

pub fn parse_iso_date(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]")).ok()
}
