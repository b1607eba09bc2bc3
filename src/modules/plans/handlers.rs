use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use validator::Validate;

use crate::api::{ApiError, AuthToken, Marketplace};
use crate::app_state::AppState;
use crate::catalog::plans::{price_label, savings_label, session_summary};
use crate::catalog::{fallback_plans, format_cents};
use crate::error::{AppError, AppResult};
use crate::models::{
    validate_processor_token, ChangePlanRequest, Plan, PlanPurchase, PlanSource, PurchasePlanRequest, UserPlan,
};
use crate::pricing::{quote_plan, PlanSelection, Quote};
use crate::state::{ActivePlanKey, ChangePlanIntent, ChangePlanIntentKey, ClientState};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanView {
    #[serde(flatten)]
    pub plan: Plan,
    pub price_label: String,
    pub session_summary: String,
    pub savings_label: Option<String>,
}

impl From<Plan> for PlanView {
    fn from(plan: Plan) -> Self {
        Self {
            price_label: price_label(&plan),
            session_summary: session_summary(&plan),
            savings_label: savings_label(&plan),
            plan,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanCatalog {
    pub plans: Vec<PlanView>,
    pub source: PlanSource,
}

/// The plan catalog, or the built-in fallback plans when it cannot be fetched.
pub(crate) async fn load_catalog(api: &dyn Marketplace, token: &AuthToken) -> AppResult<(Vec<Plan>, PlanSource)> {
    match api.list_plans(token).await {
        Ok(plans) if !plans.is_empty() => Ok((plans, PlanSource::Catalog)),
        Ok(_) => {
            warn!("Plan catalog is empty, serving fallback plans");
            Ok((fallback_plans(), PlanSource::Fallback))
        }
        Err(ApiError::Unauthorized) => Err(ApiError::Unauthorized.into()),
        Err(e) => {
            warn!(error = %e, "Plan catalog unavailable, serving fallback plans");
            Ok((fallback_plans(), PlanSource::Fallback))
        }
    }
}

pub(crate) async fn find_plan(api: &dyn Marketplace, token: &AuthToken, plan_id: &str) -> AppResult<Plan> {
    let (plans, _) = load_catalog(api, token).await?;
    plans
        .into_iter()
        .find(|plan| plan.id == plan_id && plan.is_active)
        .ok_or_else(|| AppError::NotFound(format!("Plan {plan_id}")))
}

/// Browse active plans.
pub async fn list_plans(State(state): State<AppState>, token: AuthToken) -> AppResult<Json<PlanCatalog>> {
    let (plans, source) = load_catalog(state.api.as_ref(), &token).await?;
    let plans = plans
        .into_iter()
        .filter(|plan| plan.is_active)
        .map(PlanView::from)
        .collect();
    Ok(Json(PlanCatalog { plans, source }))
}

pub async fn my_plans(State(state): State<AppState>, token: AuthToken) -> AppResult<Json<Vec<UserPlan>>> {
    Ok(Json(state.api.user_plans(&token).await?))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    #[validate(length(min = 1, message = "Plan is required"))]
    pub plan_id: String,
    #[validate(range(min = 1, max = 100))]
    pub hours: Option<u32>,
    #[validate(range(min = 15, max = 240))]
    pub duration_minutes: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteView {
    pub plan_id: String,
    #[serde(flatten)]
    pub quote: Quote,
    pub amount_cents: i64,
    pub amount_label: String,
}

impl QuoteView {
    fn new(plan_id: String, quote: Quote) -> Self {
        let amount_cents = quote.final_cents();
        Self {
            plan_id,
            quote,
            amount_cents,
            amount_label: format_cents(amount_cents),
        }
    }
}

pub async fn quote(
    State(state): State<AppState>,
    token: AuthToken,
    Json(payload): Json<QuoteRequest>,
) -> AppResult<Json<QuoteView>> {
    payload.validate()?;
    let plan = find_plan(state.api.as_ref(), &token, &payload.plan_id).await?;
    let quote = quote_plan(
        &plan,
        PlanSelection {
            hours: payload.hours,
            duration_minutes: payload.duration_minutes,
        },
    )
    .map_err(|e| AppError::BadRequest(e.to_string()))?;
    Ok(Json(QuoteView::new(plan.id, quote)))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    #[validate(length(min = 1, message = "Plan is required"))]
    pub plan_id: String,
    #[validate(custom(function = "validate_processor_token"))]
    pub payment_method_id: String,
    #[validate(range(min = 1, max = 100))]
    pub hours: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseView {
    pub purchase: PlanPurchase,
    pub plan: PlanView,
    pub amount_cents: i64,
}

/// Buy a plan. The amount is always computed here, never taken from the client.
pub async fn purchase(
    State(state): State<AppState>,
    token: AuthToken,
    client: ClientState,
    Json(payload): Json<PurchaseRequest>,
) -> AppResult<Json<PurchaseView>> {
    payload.validate()?;
    let plan = find_plan(state.api.as_ref(), &token, &payload.plan_id).await?;
    let quote = quote_plan(
        &plan,
        PlanSelection {
            hours: payload.hours,
            duration_minutes: None,
        },
    )
    .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let request = PurchasePlanRequest {
        plan_id: plan.id.clone(),
        payment_method_id: payload.payment_method_id,
        amount: quote.final_cents(),
        hours: payload.hours,
        booking_id: None,
    };
    let purchase = state.api.purchase_plan(&token, &request).await?;
    info!(plan_id = %plan.id, amount = request.amount, "Plan purchased");

    client.put::<ActivePlanKey>(&plan).await?;
    Ok(Json(PurchaseView {
        purchase,
        plan: plan.into(),
        amount_cents: request.amount,
    }))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePlanPayload {
    #[validate(length(min = 1, message = "Plan is required"))]
    pub plan_id: String,
    #[validate(range(min = 1, max = 100))]
    pub hours: Option<u32>,
}

/// Switch the active plan. When the marketplace asks for payment the change
/// is parked as an intent until [`confirm_change_plan`] settles it.
pub async fn change_plan(
    State(state): State<AppState>,
    token: AuthToken,
    client: ClientState,
    Json(payload): Json<ChangePlanPayload>,
) -> AppResult<Response> {
    payload.validate()?;
    let plan = find_plan(state.api.as_ref(), &token, &payload.plan_id).await?;
    if plan.source == PlanSource::Fallback {
        return Err(AppError::BadRequest(
            "Plans are temporarily unavailable. Please try again shortly.".to_string(),
        ));
    }

    let request = ChangePlanRequest {
        plan_id: plan.id.clone(),
    };
    match state.api.change_plan(&token, &request).await {
        Ok(result) => {
            client.put::<ActivePlanKey>(&plan).await?;
            client.remove::<ChangePlanIntentKey>().await?;
            info!(plan_id = %plan.id, "Plan changed");
            Ok(Json(json!({ "plan": PlanView::from(plan), "result": result })).into_response())
        }
        Err(ApiError::PaymentRequired { message, .. }) => {
            let quote = quote_plan(
                &plan,
                PlanSelection {
                    hours: payload.hours,
                    duration_minutes: None,
                },
            )
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
            let intent = ChangePlanIntent {
                plan_id: plan.id.clone(),
                plan_name: plan.name.clone(),
                amount_cents: quote.final_cents(),
                hours: payload.hours,
            };
            client.put::<ChangePlanIntentKey>(&intent).await?;
            info!(plan_id = %plan.id, "Plan change awaiting payment");
            let body = json!({
                "paymentRequired": true,
                "message": message,
                "intent": intent,
                "amountLabel": format_cents(intent.amount_cents),
            });
            Ok((StatusCode::PAYMENT_REQUIRED, Json(body)).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmChangePlan {
    #[validate(custom(function = "validate_processor_token"))]
    pub payment_method_id: String,
}

pub async fn pending_change_plan(client: ClientState) -> AppResult<Json<ChangePlanIntent>> {
    client
        .get::<ChangePlanIntentKey>()
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No pending plan change".to_string()))
}

pub async fn confirm_change_plan(
    State(state): State<AppState>,
    token: AuthToken,
    client: ClientState,
    Json(payload): Json<ConfirmChangePlan>,
) -> AppResult<Json<serde_json::Value>> {
    payload.validate()?;
    let intent = client
        .get::<ChangePlanIntentKey>()
        .await?
        .ok_or_else(|| AppError::NotFound("No pending plan change".to_string()))?;

    let purchase = PurchasePlanRequest {
        plan_id: intent.plan_id.clone(),
        payment_method_id: payload.payment_method_id,
        amount: intent.amount_cents,
        hours: intent.hours,
        booking_id: None,
    };
    state.api.purchase_plan(&token, &purchase).await?;
    let result = state
        .api
        .change_plan(
            &token,
            &ChangePlanRequest {
                plan_id: intent.plan_id.clone(),
            },
        )
        .await?;

    if let Ok(plan) = find_plan(state.api.as_ref(), &token, &intent.plan_id).await {
        client.put::<ActivePlanKey>(&plan).await?;
    }
    client.remove::<ChangePlanIntentKey>().await?;
    info!(plan_id = %intent.plan_id, "Plan change confirmed after payment");

    Ok(Json(json!({ "planId": intent.plan_id, "result": result })))
}
