use serde::{Deserialize, Serialize};
use time::Date;
use tracing::warn;

use super::dates::weekday_index;
use crate::models::AvailabilitySlot;

/// Start times are offered on this grid.
pub const STEP_MINUTES: u32 = 30;
const MINUTES_PER_DAY: u32 = 24 * 60;
const LAST_MINUTE: u32 = MINUTES_PER_DAY - 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateTimeSlot {
    /// 12-hour display form, e.g. `11:30 PM`.
    pub label: String,
    /// 24-hour key, e.g. `23:30`.
    pub value: String,
    pub availability_id: String,
}

/// Minutes since midnight for `HH:mm` (seconds, if present, are ignored).
pub fn parse_clock(raw: &str) -> Option<u32> {
    let mut parts = raw.trim().split(':');
    let hours: u32 = parts.next()?.parse().ok()?;
    let minutes: u32 = parts.next()?.parse().ok()?;
    (hours < 24 && minutes < 60).then_some(hours * 60 + minutes)
}

pub fn format_value(minutes: u32) -> String {
    let minutes = minutes % MINUTES_PER_DAY;
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

pub fn format_label(minutes: u32) -> String {
    let minutes = minutes % MINUTES_PER_DAY;
    let (hours, mins) = (minutes / 60, minutes % 60);
    let meridiem = if hours < 12 { "AM" } else { "PM" };
    let hour12 = match hours % 12 {
        0 => 12,
        h => h,
    };
    format!("{}:{:02} {}", hour12, mins, meridiem)
}

/// Start-time options on `date` for a session of `duration_minutes`.
///
/// Recurrence is not consulted here; date eligibility already did that.
/// Windows whose end is not after their start cross midnight and are walked
/// as a tail (start until 23:59, sessions may run into the next day up to the
/// window end) and a head (00:00 until the end).
pub fn time_slots(slots: &[AvailabilitySlot], date: Date, duration_minutes: u32) -> Vec<CandidateTimeSlot> {
    let weekday = weekday_index(date);
    let mut candidates = Vec::new();
    if duration_minutes == 0 {
        return candidates;
    }

    for slot in slots
        .iter()
        .filter(|s| s.day_of_week == weekday && s.is_available())
    {
        let (Some(start), Some(end)) = (parse_clock(&slot.start_time), parse_clock(&slot.end_time)) else {
            warn!(availability_id = %slot.id, "Skipping availability with unparseable times");
            continue;
        };

        if end <= start {
            walk(start, LAST_MINUTE, MINUTES_PER_DAY + end, duration_minutes, &slot.id, &mut candidates);
            walk(0, end, end, duration_minutes, &slot.id, &mut candidates);
        } else {
            walk(start, end, end, duration_minutes, &slot.id, &mut candidates);
        }
    }

    candidates.sort_by(|a, b| a.value.cmp(&b.value));
    candidates.dedup_by(|a, b| a.value == b.value);
    candidates
}

fn walk(
    from: u32,
    last_start: u32,
    window_end: u32,
    duration: u32,
    availability_id: &str,
    out: &mut Vec<CandidateTimeSlot>,
) {
    let mut cursor = from;
    while cursor <= last_start && cursor + duration <= window_end {
        out.push(CandidateTimeSlot {
            label: format_label(cursor),
            value: format_value(cursor),
            availability_id: availability_id.to_string(),
        });
        cursor += STEP_MINUTES;
    }
}
