use serde::Serialize;
use time::{Date, Duration};

use super::slots::parse_clock;
use crate::models::{AvailabilitySlot, Recurrence};

/// Calendar days examined per scan, starting with today.
pub const SCAN_DAYS: i64 = 30;
/// Eligible dates returned at most.
pub const MAX_ELIGIBLE_DATES: usize = 14;
/// Days offered when the availability source is empty or unusable.
pub const FALLBACK_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateScan {
    pub dates: Vec<Date>,
    /// Set when the scan fell back to offering the next few days unconditionally.
    pub degraded: bool,
}

/// Day of week with 0 = Sunday.
pub fn weekday_index(date: Date) -> u8 {
    date.weekday().number_days_from_sunday()
}

fn days_until(from: u8, to: u8) -> i64 {
    i64::from((to + 7 - from) % 7)
}

/// Which of the next [`SCAN_DAYS`] days have at least one bookable window.
///
/// Buckets are consulted in the order one-time, weekly, biweekly, monthly and
/// the first match decides; later buckets are not evaluated for that day.
/// Without a single well-formed record the degraded list is returned instead.
pub fn eligible_dates(slots: &[AvailabilitySlot], today: Date) -> DateScan {
    let usable: Vec<&AvailabilitySlot> = slots.iter().filter(|s| is_well_formed(s)).collect();
    if usable.is_empty() {
        return fallback_dates(today);
    }

    let mut one_time: Vec<&AvailabilitySlot> = Vec::new();
    let mut weekly: Vec<&AvailabilitySlot> = Vec::new();
    let mut biweekly: Vec<&AvailabilitySlot> = Vec::new();
    let mut monthly: Vec<&AvailabilitySlot> = Vec::new();
    for slot in usable {
        match slot.recurrence {
            Recurrence::OneTime => one_time.push(slot),
            Recurrence::Weekly => weekly.push(slot),
            Recurrence::Biweekly => biweekly.push(slot),
            Recurrence::Monthly => monthly.push(slot),
        }
    }

    let mut dates = Vec::new();
    for offset in 0..SCAN_DAYS {
        if dates.len() >= MAX_ELIGIBLE_DATES {
            break;
        }
        let date = today + Duration::days(offset);
        let eligible = one_time.iter().any(|s| matches_one_time(s, date, today))
            || weekly.iter().any(|s| matches_weekly(s, date))
            || biweekly.iter().any(|s| matches_biweekly(s, date, today))
            || monthly.iter().any(|s| matches_monthly(s, date));
        if eligible {
            dates.push(date);
        }
    }

    DateScan {
        dates,
        degraded: false,
    }
}

pub fn fallback_dates(today: Date) -> DateScan {
    DateScan {
        dates: (0..FALLBACK_DAYS).map(|i| today + Duration::days(i)).collect(),
        degraded: true,
    }
}

fn is_well_formed(slot: &AvailabilitySlot) -> bool {
    slot.day_of_week <= 6 && parse_clock(&slot.start_time).is_some() && parse_clock(&slot.end_time).is_some()
}

fn is_bookable(slot: &AvailabilitySlot) -> bool {
    slot.is_available() && slot.has_session_types()
}

/// The single date a one-time slot applies to: the first matching weekday on
/// or after its creation (or after today when the creation time is unknown).
fn one_time_occurrence(slot: &AvailabilitySlot, today: Date) -> Date {
    let origin = slot.created_at.map(|at| at.date()).unwrap_or(today);
    origin + Duration::days(days_until(weekday_index(origin), slot.day_of_week))
}

/// A one-time slot resolves to exactly one occurrence date, so a scan offers it
/// at most once however many weeks it covers.
fn matches_one_time(slot: &AvailabilitySlot, date: Date, today: Date) -> bool {
    slot.day_of_week == weekday_index(date) && is_bookable(slot) && one_time_occurrence(slot, today) == date
}

fn matches_weekly(slot: &AvailabilitySlot, date: Date) -> bool {
    slot.day_of_week == weekday_index(date) && is_bookable(slot)
}

fn matches_biweekly(slot: &AvailabilitySlot, date: Date, today: Date) -> bool {
    if slot.day_of_week != weekday_index(date) || !slot.is_available() {
        return false;
    }
    // Absent session types are accepted for biweekly slots; an empty list is not.
    if matches!(&slot.session_types, Some(types) if types.is_empty()) {
        return false;
    }
    let anchor = today + Duration::days(days_until(weekday_index(today), slot.day_of_week));
    let since_anchor = (date - anchor).whole_days();
    since_anchor >= 0 && since_anchor % 14 == 0
}

fn matches_monthly(slot: &AvailabilitySlot, date: Date) -> bool {
    let Some(created) = slot.created_at else {
        return false;
    };
    slot.day_of_week == weekday_index(date) && created.day() == date.day() && is_bookable(slot)
}
