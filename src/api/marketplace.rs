use async_trait::async_trait;
use serde_json::Value;

use super::{ApiClient, ApiError, AuthToken};
use crate::models::{
    AvailabilitySlot, BillingRecord, Booking, CancelBooking, ChangePlanRequest, CounselorSession,
    Invoice, NewBooking, NewCounselorSession, NewPaymentMethod, NewPlan, PaymentMethod, Plan,
    PlanPurchase, Provider, ProviderFilter, PurchasePlanRequest, UserPlan,
};

/// Every marketplace endpoint the portal uses.
///
/// Orchestration code depends on this trait rather than on [`ApiClient`].
#[async_trait]
pub trait Marketplace: Send + Sync {
    /// Reachability check used by the health endpoint.
    async fn ping(&self) -> Result<(), ApiError>;

    async fn list_plans(&self, token: &AuthToken) -> Result<Vec<Plan>, ApiError>;
    async fn create_plan(&self, token: &AuthToken, plan: &NewPlan) -> Result<Plan, ApiError>;
    async fn user_plans(&self, token: &AuthToken) -> Result<Vec<UserPlan>, ApiError>;
    async fn purchase_plan(
        &self,
        token: &AuthToken,
        request: &PurchasePlanRequest,
    ) -> Result<PlanPurchase, ApiError>;
    async fn change_plan(&self, token: &AuthToken, request: &ChangePlanRequest) -> Result<Value, ApiError>;

    async fn payment_methods(&self, token: &AuthToken) -> Result<Vec<PaymentMethod>, ApiError>;
    async fn add_payment_method(
        &self,
        token: &AuthToken,
        method: &NewPaymentMethod,
    ) -> Result<PaymentMethod, ApiError>;
    async fn set_default_payment_method(&self, token: &AuthToken, id: &str) -> Result<PaymentMethod, ApiError>;
    async fn delete_payment_method(&self, token: &AuthToken, id: &str) -> Result<(), ApiError>;
    async fn billing_history(&self, token: &AuthToken) -> Result<Vec<BillingRecord>, ApiError>;
    async fn invoice(&self, token: &AuthToken, id: &str) -> Result<Invoice, ApiError>;

    async fn my_bookings(&self, token: &AuthToken) -> Result<Vec<Booking>, ApiError>;
    async fn create_booking(&self, token: &AuthToken, booking: &NewBooking) -> Result<Booking, ApiError>;
    async fn cancel_booking(
        &self,
        token: &AuthToken,
        id: &str,
        request: &CancelBooking,
    ) -> Result<Booking, ApiError>;

    async fn tutors(&self, token: &AuthToken, filter: &ProviderFilter) -> Result<Vec<Provider>, ApiError>;
    /// Raw availability records; parsing and validation happen in the slot engine.
    async fn tutor_availability(&self, token: &AuthToken, tutor_id: &str) -> Result<Vec<Value>, ApiError>;
    async fn counselors(&self, token: &AuthToken) -> Result<Vec<Provider>, ApiError>;
    async fn counselor_sessions(
        &self,
        token: &AuthToken,
        counselor_id: &str,
    ) -> Result<Vec<CounselorSession>, ApiError>;
    async fn book_counselor_session(
        &self,
        token: &AuthToken,
        session: &NewCounselorSession,
    ) -> Result<CounselorSession, ApiError>;
}

#[async_trait]
impl Marketplace for ApiClient {
    async fn ping(&self) -> Result<(), ApiError> {
        self.probe().await
    }

    async fn list_plans(&self, token: &AuthToken) -> Result<Vec<Plan>, ApiError> {
        self.get("/plans", token, &["plans"]).await
    }

    async fn create_plan(&self, token: &AuthToken, plan: &NewPlan) -> Result<Plan, ApiError> {
        self.post("/plans", token, plan).await
    }

    async fn user_plans(&self, token: &AuthToken) -> Result<Vec<UserPlan>, ApiError> {
        self.get("/plans/user", token, &["plans", "userPlans"]).await
    }

    async fn purchase_plan(
        &self,
        token: &AuthToken,
        request: &PurchasePlanRequest,
    ) -> Result<PlanPurchase, ApiError> {
        self.post("/plans/purchase", token, request).await
    }

    async fn change_plan(&self, token: &AuthToken, request: &ChangePlanRequest) -> Result<Value, ApiError> {
        self.post("/users/plan/change", token, request).await
    }

    async fn payment_methods(&self, token: &AuthToken) -> Result<Vec<PaymentMethod>, ApiError> {
        self.get("/payment-methods", token, &["paymentMethods"]).await
    }

    async fn add_payment_method(
        &self,
        token: &AuthToken,
        method: &NewPaymentMethod,
    ) -> Result<PaymentMethod, ApiError> {
        self.post("/payment-methods", token, method).await
    }

    async fn set_default_payment_method(&self, token: &AuthToken, id: &str) -> Result<PaymentMethod, ApiError> {
        self.put(&format!("/payment-methods/{id}/default"), token, &serde_json::json!({}))
            .await
    }

    async fn delete_payment_method(&self, token: &AuthToken, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/payment-methods/{id}"), token).await
    }

    async fn billing_history(&self, token: &AuthToken) -> Result<Vec<BillingRecord>, ApiError> {
        self.get("/payments/billing/history", token, &["payments", "history"])
            .await
    }

    async fn invoice(&self, token: &AuthToken, id: &str) -> Result<Invoice, ApiError> {
        self.get(&format!("/payments/billing/invoice/{id}"), token, &["invoice"])
            .await
    }

    async fn my_bookings(&self, token: &AuthToken) -> Result<Vec<Booking>, ApiError> {
        self.get("/bookings/my", token, &["bookings"]).await
    }

    async fn create_booking(&self, token: &AuthToken, booking: &NewBooking) -> Result<Booking, ApiError> {
        self.post("/bookings", token, booking).await
    }

    async fn cancel_booking(
        &self,
        token: &AuthToken,
        id: &str,
        request: &CancelBooking,
    ) -> Result<Booking, ApiError> {
        self.put(&format!("/bookings/{id}/cancel"), token, request).await
    }

    async fn tutors(&self, token: &AuthToken, filter: &ProviderFilter) -> Result<Vec<Provider>, ApiError> {
        self.get_query("/tutors", token, filter, &["tutors"]).await
    }

    async fn tutor_availability(&self, token: &AuthToken, tutor_id: &str) -> Result<Vec<Value>, ApiError> {
        self.get(
            &format!("/tutors/{tutor_id}/availability"),
            token,
            &["availability", "slots"],
        )
        .await
    }

    async fn counselors(&self, token: &AuthToken) -> Result<Vec<Provider>, ApiError> {
        self.get("/counselors", token, &["counselors"]).await
    }

    async fn counselor_sessions(
        &self,
        token: &AuthToken,
        counselor_id: &str,
    ) -> Result<Vec<CounselorSession>, ApiError> {
        self.get(
            &format!("/counselors/{counselor_id}/sessions"),
            token,
            &["sessions"],
        )
        .await
    }

    async fn book_counselor_session(
        &self,
        token: &AuthToken,
        session: &NewCounselorSession,
    ) -> Result<CounselorSession, ApiError> {
        self.post("/counselor-sessions", token, session).await
    }
}

/// Parse raw availability records, dropping entries that do not decode.
pub fn parse_availability(records: Vec<Value>) -> Vec<AvailabilitySlot> {
    records
        .into_iter()
        .filter_map(|record| match serde_json::from_value::<AvailabilitySlot>(record) {
            Ok(slot) => Some(slot),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed availability record");
                None
            }
        })
        .collect()
}
