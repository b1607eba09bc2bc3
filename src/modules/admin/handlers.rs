use axum::{extract::State, http::StatusCode, Json};
use tracing::info;
use validator::Validate;

use crate::api::AuthToken;
use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{NewPlan, Plan, PlanType};

/// Catalog rules the field validators cannot express on their own.
fn check_plan_shape(plan: &NewPlan) -> Result<(), AppError> {
    if let (Some(min), Some(max)) = (plan.min_hours, plan.max_hours) {
        if min > max {
            return Err(AppError::BadRequest(
                "Minimum hours cannot exceed maximum hours".to_string(),
            ));
        }
    }
    if plan.plan_type == PlanType::Monthly && plan.session_count.is_none() {
        return Err(AppError::BadRequest(
            "Monthly plans need a session count".to_string(),
        ));
    }
    Ok(())
}

/// The whole catalog, inactive plans included. No fallback here: admins
/// must see what the marketplace actually holds.
pub async fn list_all_plans(State(state): State<AppState>, token: AuthToken) -> AppResult<Json<Vec<Plan>>> {
    Ok(Json(state.api.list_plans(&token).await?))
}

pub async fn create_plan(
    State(state): State<AppState>,
    token: AuthToken,
    Json(payload): Json<NewPlan>,
) -> AppResult<(StatusCode, Json<Plan>)> {
    payload.validate()?;
    check_plan_shape(&payload)?;
    let plan = state.api.create_plan(&token, &payload).await?;
    info!(plan_id = %plan.id, plan_type = ?plan.plan_type, "Plan created");
    Ok((StatusCode::CREATED, Json(plan)))
}
