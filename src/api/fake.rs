//! In-process stand-in for the marketplace used by unit tests.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

use super::{ApiError, AuthToken, Marketplace};
use crate::models::{
    BillingRecord, Booking, CancelBooking, ChangePlanRequest, CounselorSession, Invoice, NewBooking,
    NewCounselorSession, NewPaymentMethod, NewPlan, PaymentMethod, Plan, PlanPurchase, Provider,
    ProviderFilter, PurchasePlanRequest, UserPlan,
};

#[derive(Default)]
pub(crate) struct FakeMarketplace {
    pub plans: Vec<Plan>,
    pub tutors: Vec<Provider>,
    pub availability: Vec<Value>,
    pub bookings: Vec<Booking>,
    pub booking_results: Mutex<VecDeque<Result<Booking, ApiError>>>,
    pub change_plan_results: Mutex<VecDeque<Result<Value, ApiError>>>,
    pub submitted: Mutex<Vec<NewBooking>>,
    pub purchases: Mutex<Vec<PurchasePlanRequest>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeMarketplace {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn push_booking_result(&self, result: Result<Booking, ApiError>) {
        self.booking_results.lock().unwrap().push_back(result);
    }

    pub fn push_change_plan_result(&self, result: Result<Value, ApiError>) {
        self.change_plan_results.lock().unwrap().push_back(result);
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

fn not_faked<T>() -> Result<T, ApiError> {
    Err(ApiError::Status {
        status: 501,
        message: "not faked".to_string(),
    })
}

#[async_trait]
impl Marketplace for FakeMarketplace {
    async fn ping(&self) -> Result<(), ApiError> {
        Ok(())
    }

    async fn list_plans(&self, _token: &AuthToken) -> Result<Vec<Plan>, ApiError> {
        self.record("list_plans");
        Ok(self.plans.clone())
    }

    async fn create_plan(&self, _token: &AuthToken, _plan: &NewPlan) -> Result<Plan, ApiError> {
        self.record("create_plan");
        not_faked()
    }

    async fn user_plans(&self, _token: &AuthToken) -> Result<Vec<UserPlan>, ApiError> {
        self.record("user_plans");
        Ok(Vec::new())
    }

    async fn purchase_plan(
        &self,
        _token: &AuthToken,
        request: &PurchasePlanRequest,
    ) -> Result<PlanPurchase, ApiError> {
        self.record(format!("purchase_plan:{}", request.plan_id));
        self.purchases.lock().unwrap().push(request.clone());
        Ok(PlanPurchase {
            id: Some("purchase-1".to_string()),
            status: Some("succeeded".to_string()),
            amount: Some(request.amount),
        })
    }

    async fn change_plan(&self, _token: &AuthToken, request: &ChangePlanRequest) -> Result<Value, ApiError> {
        self.record(format!("change_plan:{}", request.plan_id));
        self.change_plan_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(json!({"planId": request.plan_id})))
    }

    async fn payment_methods(&self, _token: &AuthToken) -> Result<Vec<PaymentMethod>, ApiError> {
        self.record("payment_methods");
        not_faked()
    }

    async fn add_payment_method(
        &self,
        _token: &AuthToken,
        _method: &NewPaymentMethod,
    ) -> Result<PaymentMethod, ApiError> {
        self.record("add_payment_method");
        not_faked()
    }

    async fn set_default_payment_method(&self, _token: &AuthToken, id: &str) -> Result<PaymentMethod, ApiError> {
        self.record(format!("set_default_payment_method:{id}"));
        not_faked()
    }

    async fn delete_payment_method(&self, _token: &AuthToken, id: &str) -> Result<(), ApiError> {
        self.record(format!("delete_payment_method:{id}"));
        not_faked()
    }

    async fn billing_history(&self, _token: &AuthToken) -> Result<Vec<BillingRecord>, ApiError> {
        self.record("billing_history");
        not_faked()
    }

    async fn invoice(&self, _token: &AuthToken, id: &str) -> Result<Invoice, ApiError> {
        self.record(format!("invoice:{id}"));
        not_faked()
    }

    async fn my_bookings(&self, _token: &AuthToken) -> Result<Vec<Booking>, ApiError> {
        self.record("my_bookings");
        Ok(self.bookings.clone())
    }

    async fn create_booking(&self, _token: &AuthToken, booking: &NewBooking) -> Result<Booking, ApiError> {
        self.record("create_booking");
        self.submitted.lock().unwrap().push(booking.clone());
        self.booking_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(not_faked)
    }

    async fn cancel_booking(
        &self,
        _token: &AuthToken,
        id: &str,
        _request: &CancelBooking,
    ) -> Result<Booking, ApiError> {
        self.record(format!("cancel_booking:{id}"));
        let mut booking = self
            .bookings
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or(ApiError::Status {
                status: 404,
                message: "Booking not found".to_string(),
            })?;
        booking.status = crate::models::BookingStatus::Cancelled;
        Ok(booking)
    }

    async fn tutors(&self, _token: &AuthToken, filter: &ProviderFilter) -> Result<Vec<Provider>, ApiError> {
        self.record(format!(
            "tutors:{}:{}",
            filter.subject.as_deref().unwrap_or(""),
            filter.service_type.as_deref().unwrap_or("")
        ));
        Ok(self.tutors.clone())
    }

    async fn tutor_availability(&self, _token: &AuthToken, tutor_id: &str) -> Result<Vec<Value>, ApiError> {
        self.record(format!("tutor_availability:{tutor_id}"));
        Ok(self.availability.clone())
    }

    async fn counselors(&self, _token: &AuthToken) -> Result<Vec<Provider>, ApiError> {
        self.record("counselors");
        not_faked()
    }

    async fn counselor_sessions(
        &self,
        _token: &AuthToken,
        counselor_id: &str,
    ) -> Result<Vec<CounselorSession>, ApiError> {
        self.record(format!("counselor_sessions:{counselor_id}"));
        not_faked()
    }

    async fn book_counselor_session(
        &self,
        _token: &AuthToken,
        _session: &NewCounselorSession,
    ) -> Result<CounselorSession, ApiError> {
        self.record("book_counselor_session");
        not_faked()
    }
}
