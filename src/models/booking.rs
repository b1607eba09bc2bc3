use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    #[serde(alias = "scheduled")]
    Confirmed,
    Completed,
    #[serde(alias = "canceled")]
    Cancelled,
    #[serde(alias = "no-show")]
    NoShow,
}

/// A booked session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub tutor_id: Option<String>,
    #[serde(default)]
    pub tutor_name: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub service_type: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_time: OffsetDateTime,
    #[serde(default)]
    pub duration: Option<u32>,
    pub status: BookingStatus,
    #[serde(default)]
    pub is_paid: Option<bool>,
    #[serde(default)]
    pub price: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub plan_id: Option<String>,
}

impl Booking {
    pub fn duration_minutes(&self) -> i64 {
        self.duration
            .map(i64::from)
            .unwrap_or_else(|| (self.end_time - self.start_time).whole_minutes())
    }
}

/// Payload for `POST /bookings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub tutor_id: String,
    pub subject: String,
    pub service_type: String,
    pub start_time: String,
    pub end_time: String,
    pub duration: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,
    /// Integer cents.
    pub price: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CancelBooking {
    #[validate(length(max = 500, message = "Reason is too long"))]
    pub reason: Option<String>,
}
