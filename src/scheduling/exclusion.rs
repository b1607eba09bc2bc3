use serde::{Deserialize, Serialize};
use time::Date;

use super::slots::CandidateTimeSlot;

/// A slot this browser booked moments ago.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentlyBookedSlot {
    pub tutor_id: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:mm`
    pub value: String,
}

impl RecentlyBookedSlot {
    pub fn new(tutor_id: impl Into<String>, date: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            tutor_id: tutor_id.into(),
            date: date.into(),
            value: value.into(),
        }
    }
}

/// Client-side list of just-booked slots hidden from later candidate lists.
///
/// Advisory only: the marketplace stays the authority on conflicts. Entries
/// are never evicted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExclusionCache {
    entries: Vec<RecentlyBookedSlot>,
}

impl ExclusionCache {
    /// Returns `false` when the slot was already present.
    pub fn insert(&mut self, slot: RecentlyBookedSlot) -> bool {
        if self.entries.contains(&slot) {
            return false;
        }
        self.entries.push(slot);
        true
    }

    pub fn contains(&self, tutor_id: &str, date: &str, value: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.tutor_id == tutor_id && e.date == date && e.value == value)
    }

    pub fn retain_available(
        &self,
        tutor_id: &str,
        date: Date,
        candidates: Vec<CandidateTimeSlot>,
    ) -> Vec<CandidateTimeSlot> {
        let date = super::iso_date(date);
        candidates
            .into_iter()
            .filter(|c| !self.contains(tutor_id, &date, &c.value))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
