//! Price computation for plan selections. Every screen that shows or submits
//! a price goes through these functions.

use serde::Serialize;
use thiserror::Error;

use crate::models::{Plan, PlanType};

#[derive(Debug, Error, PartialEq)]
pub enum PricingError {
    #[error("Select between {min} and {max} hours (got {hours})")]
    HoursOutOfRange { hours: u32, min: u32, max: u32 },

    #[error("Number of hours is required for this plan")]
    MissingHours,

    #[error("Session duration must be positive")]
    InvalidDuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub base_price: f64,
    pub discount_percentage: u32,
    pub discount: f64,
    pub final_price: f64,
}

impl Quote {
    fn flat(price: f64) -> Self {
        Quote {
            base_price: price,
            discount_percentage: 0,
            discount: 0.0,
            final_price: price,
        }
    }

    pub fn final_cents(&self) -> i64 {
        to_cents(self.final_price)
    }
}

/// Tiered, cliff-edged discount for multi-hour packages.
pub fn multi_hour_discount_percentage(hours: u32) -> u32 {
    match hours {
        h if h >= 11 => 20,
        h if h >= 6 => 10,
        h if h >= 2 => 5,
        _ => 0,
    }
}

pub fn multi_hour_quote(unit_price: f64, hours: u32) -> Quote {
    let base_price = unit_price * f64::from(hours);
    let discount_percentage = multi_hour_discount_percentage(hours);
    let discount = base_price * f64::from(discount_percentage) / 100.0;
    Quote {
        base_price,
        discount_percentage,
        discount,
        final_price: base_price - discount,
    }
}

/// Linear proration by time; no tiering.
pub fn single_session_price(hourly_rate: f64, duration_minutes: u32) -> f64 {
    hourly_rate * (f64::from(duration_minutes) / 60.0)
}

/// Amount submitted upstream, in integer cents.
pub fn to_cents(price: f64) -> i64 {
    (price * 100.0).round() as i64
}

/// What the student picked on top of the plan itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanSelection {
    pub hours: Option<u32>,
    pub duration_minutes: Option<u32>,
}

pub fn quote_plan(plan: &Plan, selection: PlanSelection) -> Result<Quote, PricingError> {
    match plan.plan_type {
        PlanType::Monthly => Ok(Quote::flat(plan.calculated_price.unwrap_or(plan.price))),
        PlanType::MultiHour => {
            let hours = selection.hours.ok_or(PricingError::MissingHours)?;
            let min = plan.min_hours.unwrap_or(1);
            let max = plan.max_hours.unwrap_or(u32::MAX);
            if hours < min || hours > max || hours == 0 {
                return Err(PricingError::HoursOutOfRange {
                    hours,
                    min,
                    max,
                });
            }
            Ok(multi_hour_quote(plan.price, hours))
        }
        PlanType::Single => {
            let minutes = selection.duration_minutes.unwrap_or(plan.duration);
            if minutes == 0 {
                return Err(PricingError::InvalidDuration);
            }
            Ok(Quote::flat(single_session_price(plan.price, minutes)))
        }
    }
}
