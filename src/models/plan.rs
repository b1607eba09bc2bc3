use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use validator::Validate;

use crate::catalog::ServiceType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    Monthly,
    #[serde(alias = "multi-hour", alias = "multiHour")]
    MultiHour,
    Single,
}

/// Where a plan came from. Fallback plans are never activated upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanSource {
    #[default]
    Catalog,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub plan_type: PlanType,
    pub price: f64,
    #[serde(default)]
    pub calculated_price: Option<f64>,
    #[serde(default)]
    pub session_count: Option<u32>,
    /// Session length in minutes.
    #[serde(default = "default_duration")]
    pub duration: u32,
    #[serde(default)]
    pub discount: f64,
    #[serde(default)]
    pub discount_percentage: f64,
    #[serde(default)]
    pub min_hours: Option<u32>,
    #[serde(default)]
    pub max_hours: Option<u32>,
    #[serde(default)]
    pub service_type: Option<ServiceType>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub source: PlanSource,
}

fn default_duration() -> u32 {
    60
}

fn default_active() -> bool {
    true
}

/// A plan the signed-in user owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPlan {
    #[serde(alias = "_id")]
    pub id: String,
    pub plan_id: String,
    #[serde(default)]
    pub plan_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub sessions_remaining: Option<u32>,
    #[serde(default)]
    pub hours_remaining: Option<f64>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchasePlanRequest {
    pub plan_id: String,
    pub payment_method_id: String,
    /// Integer cents.
    pub amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanPurchase {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePlanRequest {
    pub plan_id: String,
}

/// Admin payload for a new catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewPlan {
    #[validate(length(min = 1, max = 120, message = "Name must not be empty"))]
    pub name: String,
    #[serde(rename = "type")]
    pub plan_type: PlanType,
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: f64,
    #[validate(range(min = 1, max = 100))]
    pub session_count: Option<u32>,
    #[validate(range(min = 15, max = 240, message = "Duration must be between 15 and 240 minutes"))]
    pub duration: u32,
    #[validate(range(min = 1, max = 100))]
    pub min_hours: Option<u32>,
    #[validate(range(min = 1, max = 100))]
    pub max_hours: Option<u32>,
    pub service_type: Option<ServiceType>,
}
