use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;

use crate::models::{Booking, BookingStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBucket {
    Upcoming,
    Past,
    Cancelled,
}

/// A session that has not ended yet is still upcoming.
pub fn classify(booking: &Booking, now: OffsetDateTime) -> SessionBucket {
    match booking.status {
        BookingStatus::Cancelled => SessionBucket::Cancelled,
        BookingStatus::Completed | BookingStatus::NoShow => SessionBucket::Past,
        BookingStatus::Pending | BookingStatus::Confirmed if booking.end_time > now => SessionBucket::Upcoming,
        BookingStatus::Pending | BookingStatus::Confirmed => SessionBucket::Past,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionList {
    /// Soonest first.
    pub upcoming: Vec<Booking>,
    /// Most recent first.
    pub past: Vec<Booking>,
    pub cancelled: Vec<Booking>,
}

impl SessionList {
    pub fn from_bookings(bookings: Vec<Booking>, now: OffsetDateTime) -> Self {
        let mut list = SessionList::default();
        for booking in bookings {
            match classify(&booking, now) {
                SessionBucket::Upcoming => list.upcoming.push(booking),
                SessionBucket::Past => list.past.push(booking),
                SessionBucket::Cancelled => list.cancelled.push(booking),
            }
        }
        list.upcoming.sort_by_key(|b| b.start_time);
        list.past.sort_by_key(|b| std::cmp::Reverse(b.start_time));
        list.cancelled.sort_by_key(|b| std::cmp::Reverse(b.start_time));
        list
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub total: usize,
    pub upcoming: usize,
    pub completed: usize,
    pub cancelled: usize,
    /// Hours across every session that was not cancelled.
    pub hours_booked: f64,
}

pub fn session_stats(bookings: &[Booking], now: OffsetDateTime) -> SessionStats {
    let mut stats = SessionStats {
        total: bookings.len(),
        ..SessionStats::default()
    };
    let mut minutes = 0i64;
    for booking in bookings {
        match classify(booking, now) {
            SessionBucket::Upcoming => stats.upcoming += 1,
            SessionBucket::Cancelled => stats.cancelled += 1,
            SessionBucket::Past => {
                if booking.status == BookingStatus::Completed {
                    stats.completed += 1;
                }
            }
        }
        if booking.status != BookingStatus::Cancelled {
            minutes += booking.duration_minutes().max(0);
        }
    }
    stats.hours_booked = minutes as f64 / 60.0;
    stats
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CancelRefused {
    #[error("This session is already cancelled")]
    AlreadyCancelled,

    #[error("Completed sessions cannot be cancelled")]
    Finished,

    #[error("Sessions that have already started cannot be cancelled")]
    Started,
}

/// Only pending or confirmed sessions that have not started can be cancelled.
pub fn ensure_cancellable(booking: &Booking, now: OffsetDateTime) -> Result<(), CancelRefused> {
    match booking.status {
        BookingStatus::Cancelled => Err(CancelRefused::AlreadyCancelled),
        BookingStatus::Completed | BookingStatus::NoShow => Err(CancelRefused::Finished),
        BookingStatus::Pending | BookingStatus::Confirmed if booking.start_time <= now => {
            Err(CancelRefused::Started)
        }
        BookingStatus::Pending | BookingStatus::Confirmed => Ok(()),
    }
}
