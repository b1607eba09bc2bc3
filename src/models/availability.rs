use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Repetition rule of a tutor availability window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Recurrence {
    OneTime,
    #[default]
    Weekly,
    Biweekly,
    Monthly,
}

/// A tutor's availability window as the marketplace API returns it.
///
/// `day_of_week` is 0-6 with 0 = Sunday. When `end_time <= start_time` the
/// window runs past midnight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySlot {
    #[serde(alias = "_id")]
    pub id: String,
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub recurrence: Recurrence,
    #[serde(default)]
    pub is_available: Option<bool>,
    #[serde(default)]
    pub session_types: Option<Vec<String>>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}

impl AvailabilitySlot {
    /// Only an explicit `false` disables a slot.
    pub fn is_available(&self) -> bool {
        self.is_available != Some(false)
    }

    pub fn has_session_types(&self) -> bool {
        self.session_types
            .as_ref()
            .is_some_and(|types| !types.is_empty())
    }
}
