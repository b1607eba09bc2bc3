use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::info;
use validator::Validate;

use crate::api::AuthToken;
use crate::app_state::AppState;
use crate::catalog::format_cents;
use crate::error::AppResult;
use crate::models::{BillingRecord, Invoice, NewPaymentMethod, PaymentMethod};

pub async fn list_payment_methods(
    State(state): State<AppState>,
    token: AuthToken,
) -> AppResult<Json<Vec<PaymentMethod>>> {
    Ok(Json(state.api.payment_methods(&token).await?))
}

/// Register a card the browser already tokenized with the processor.
pub async fn add_payment_method(
    State(state): State<AppState>,
    token: AuthToken,
    Json(payload): Json<NewPaymentMethod>,
) -> AppResult<(StatusCode, Json<PaymentMethod>)> {
    payload.validate()?;
    let method = state.api.add_payment_method(&token, &payload).await?;
    info!(payment_method = %method.id, "Payment method added");
    Ok((StatusCode::CREATED, Json(method)))
}

pub async fn set_default_payment_method(
    State(state): State<AppState>,
    token: AuthToken,
    Path(id): Path<String>,
) -> AppResult<Json<PaymentMethod>> {
    Ok(Json(state.api.set_default_payment_method(&token, &id).await?))
}

pub async fn delete_payment_method(
    State(state): State<AppState>,
    token: AuthToken,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.api.delete_payment_method(&token, &id).await?;
    info!(payment_method = %id, "Payment method removed");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingEntry {
    #[serde(flatten)]
    pub record: BillingRecord,
    pub amount_label: String,
}

impl From<BillingRecord> for BillingEntry {
    fn from(record: BillingRecord) -> Self {
        Self {
            amount_label: format_cents(record.amount),
            record,
        }
    }
}

/// Billing history, newest first.
pub async fn billing_history(
    State(state): State<AppState>,
    token: AuthToken,
) -> AppResult<Json<Vec<BillingEntry>>> {
    let mut records = state.api.billing_history(&token).await?;
    records.sort_by_key(|r| std::cmp::Reverse(r.created_at));
    Ok(Json(records.into_iter().map(BillingEntry::from).collect()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceView {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub amount_label: String,
}

pub async fn invoice(
    State(state): State<AppState>,
    token: AuthToken,
    Path(id): Path<String>,
) -> AppResult<Json<InvoiceView>> {
    let invoice = state.api.invoice(&token, &id).await?;
    Ok(Json(InvoiceView {
        amount_label: format_cents(invoice.amount),
        invoice,
    }))
}
