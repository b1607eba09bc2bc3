use crate::models::{Plan, PlanSource, PlanType};

/// Served when the catalog endpoint is unreachable so students can still browse.
pub fn fallback_plans() -> Vec<Plan> {
    vec![
        fallback("fallback-single", "Single Session", PlanType::Single, 74.99, None, None, None),
        fallback(
            "fallback-multi-hour",
            "Multi-Hour Package",
            PlanType::MultiHour,
            74.99,
            None,
            Some(1),
            Some(20),
        ),
        fallback(
            "fallback-monthly",
            "Monthly Plan",
            PlanType::Monthly,
            299.0,
            Some(4),
            None,
            None,
        ),
    ]
}

fn fallback(
    id: &str,
    name: &str,
    plan_type: PlanType,
    price: f64,
    session_count: Option<u32>,
    min_hours: Option<u32>,
    max_hours: Option<u32>,
) -> Plan {
    Plan {
        id: id.to_string(),
        name: name.to_string(),
        plan_type,
        price,
        calculated_price: Some(price),
        session_count,
        duration: 60,
        discount: 0.0,
        discount_percentage: 0.0,
        min_hours,
        max_hours,
        service_type: None,
        is_active: true,
        source: PlanSource::Fallback,
    }
}

pub fn format_price(amount: f64) -> String {
    format!("${:.2}", amount)
}

pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!("{}${}.{:02}", sign, cents / 100, cents % 100)
}

/// Price label as shown on a plan card.
pub fn price_label(plan: &Plan) -> String {
    match plan.plan_type {
        PlanType::Monthly => format!("{}/mo", format_price(plan.calculated_price.unwrap_or(plan.price))),
        PlanType::MultiHour => format!("{}/hr", format_price(plan.price)),
        PlanType::Single => format_price(plan.calculated_price.unwrap_or(plan.price)),
    }
}

pub fn session_summary(plan: &Plan) -> String {
    match (plan.plan_type, plan.session_count) {
        (PlanType::Monthly, Some(count)) => {
            let noun = if count == 1 { "session" } else { "sessions" };
            format!("{} {} · {} min", count, noun, plan.duration)
        }
        (PlanType::MultiHour, _) => match (plan.min_hours, plan.max_hours) {
            (Some(min), Some(max)) => format!("{}-{} hours", min, max),
            _ => "Flexible hours".to_string(),
        },
        _ => format!("{} min", plan.duration),
    }
}

pub fn savings_label(plan: &Plan) -> Option<String> {
    (plan.discount_percentage > 0.0).then(|| format!("Save {}%", plan.discount_percentage.round() as i64))
}
