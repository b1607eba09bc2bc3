mod common;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};
use std::sync::atomic::Ordering;

use common::{call, spawn_portal, spawn_upstream, Browser, EXPIRED_TOKEN};

#[tokio::test]
async fn health_reports_store_and_upstream() {
    let upstream = spawn_upstream().await;
    let portal = spawn_portal(&upstream).await;

    let reply = call(&portal, Method::GET, "/health", None, None, None).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "ok");
    assert_eq!(reply.body["services"]["stateStore"]["backend"], "memory");
    assert_eq!(reply.body["services"]["stateStore"]["status"], "healthy");
    assert_eq!(reply.body["services"]["marketplaceApi"], "healthy");
}

#[tokio::test]
async fn responses_carry_a_client_session() {
    let upstream = spawn_upstream().await;
    let portal = spawn_portal(&upstream).await;

    let reply = call(&portal, Method::GET, "/", None, None, None).await;
    let minted = reply.headers.get("x-client-session").and_then(|v| v.to_str().ok()).unwrap();
    assert!(uuid::Uuid::parse_str(minted).is_ok());

    let browser = Browser::new(&portal);
    let reply = browser.get("/api/booking").await;
    assert_eq!(
        reply.headers.get("x-client-session").and_then(|v| v.to_str().ok()),
        Some(browser.session.to_string().as_str())
    );
}

#[tokio::test]
async fn plan_catalog_hides_inactive_plans() {
    let upstream = spawn_upstream().await;
    let portal = spawn_portal(&upstream).await;
    let browser = Browser::new(&portal);

    let reply = browser.get("/api/plans").await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["source"], "catalog");
    let ids: Vec<&str> = reply.body["plans"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["id"].as_str())
        .collect();
    assert_eq!(ids, vec!["plan-single", "plan-bundle"]);
}

#[tokio::test]
async fn plan_catalog_falls_back_when_upstream_fails() {
    let upstream = spawn_upstream().await;
    upstream.state.plans_fail.store(true, Ordering::SeqCst);
    let portal = spawn_portal(&upstream).await;
    let browser = Browser::new(&portal);

    let reply = browser.get("/api/plans").await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["source"], "fallback");
    assert!(!reply.body["plans"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn multi_hour_quote_applies_the_tier_discount() {
    let upstream = spawn_upstream().await;
    let portal = spawn_portal(&upstream).await;
    let browser = Browser::new(&portal);

    let reply = browser
        .post("/api/plans/quote", json!({"planId": "plan-bundle", "hours": 6}))
        .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["amountCents"], 40495);
    assert_eq!(reply.body["amountLabel"], "$404.95");
}

#[tokio::test]
async fn missing_token_is_sent_to_login() {
    let upstream = spawn_upstream().await;
    let portal = spawn_portal(&upstream).await;

    let reply = call(&portal, Method::GET, "/api/plans", None, None, None).await;

    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"]["redirect"], "/login");
}

#[tokio::test]
async fn expired_token_evicts_client_state() {
    let upstream = spawn_upstream().await;
    let portal = spawn_portal(&upstream).await;
    let browser = Browser::new(&portal);

    browser.post("/api/booking/start", json!({"mode": "fresh"})).await;
    let reply = browser.put("/api/booking/draft", json!({"serviceType": "tutoring"})).await;
    assert_eq!(reply.body["draft"]["serviceType"], "tutoring");

    let reply = call(
        &portal,
        Method::GET,
        "/api/plans",
        Some(EXPIRED_TOKEN),
        Some(browser.session),
        None,
    )
    .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"]["redirect"], "/login");

    let reply = browser.get("/api/booking").await;
    assert_eq!(reply.body["draft"]["serviceType"], Value::Null);
    assert_eq!(reply.body["step"], "service");
}

#[tokio::test]
async fn raw_card_numbers_are_rejected_before_any_upstream_call() {
    let upstream = spawn_upstream().await;
    let portal = spawn_portal(&upstream).await;
    let browser = Browser::new(&portal);

    let reply = browser
        .post("/api/payments/methods", json!({"paymentMethodId": "4242424242424242"}))
        .await;

    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(reply.body["error"]["fields"].as_object().is_some_and(|f| !f.is_empty()));
}

#[tokio::test]
async fn incomplete_step_cannot_be_left() {
    let upstream = spawn_upstream().await;
    let portal = spawn_portal(&upstream).await;
    let browser = Browser::new(&portal);

    browser.post("/api/booking/start", json!({})).await;
    let reply = browser.post("/api/booking/advance", json!({})).await;

    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(reply.body["error"]["step"], "service");
    assert!(upstream.state.plan_changes().is_empty());
}

/// Drive a fresh booking up to the confirm step and return the chosen date.
async fn walk_to_confirm(browser: &Browser<'_>) -> String {
    let reply = browser.post("/api/booking/start", json!({"mode": "fresh"})).await;
    assert_eq!(reply.status, StatusCode::OK);

    browser.put("/api/booking/draft", json!({"serviceType": "tutoring"})).await;
    let reply = browser.post("/api/booking/advance", json!({})).await;
    assert_eq!(reply.body["step"], "plan");

    let reply = browser.put("/api/booking/draft", json!({"planId": "plan-single"})).await;
    assert_eq!(reply.status, StatusCode::OK);
    let reply = browser.post("/api/booking/advance", json!({})).await;
    assert_eq!(reply.body["step"], "subject");

    browser.put("/api/booking/draft", json!({"subject": "Algebra"})).await;
    let reply = browser.post("/api/booking/advance", json!({})).await;
    assert_eq!(reply.body["step"], "provider");
    assert_eq!(reply.body["wizard"]["draft"]["providers"][0]["id"], "t1");

    browser.put("/api/booking/draft", json!({"providerId": "t1"})).await;
    let reply = browser.post("/api/booking/advance", json!({})).await;
    assert_eq!(reply.body["step"], "datetime");

    let reply = browser.get("/api/booking/dates").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["degraded"], false);
    let date = reply.body["dates"][1].as_str().unwrap().to_string();

    let reply = browser.get(&format!("/api/booking/times?date={date}")).await;
    assert_eq!(reply.body["slots"][0]["value"], "09:00");
    assert_eq!(reply.body["slots"][0]["label"], "9:00 AM");

    let reply = browser
        .put("/api/booking/draft", json!({"date": date, "time": "09:00"}))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["draft"]["startTimeISO"], format!("{date}T09:00:00Z"));

    let reply = browser.post("/api/booking/advance", json!({})).await;
    assert_eq!(reply.body["step"], "details");
    let reply = browser.post("/api/booking/advance", json!({})).await;
    assert_eq!(reply.body["step"], "confirm");
    date
}

#[tokio::test]
async fn booking_flow_books_and_lists_the_session() {
    let upstream = spawn_upstream().await;
    let portal = spawn_portal(&upstream).await;
    let browser = Browser::new(&portal);

    walk_to_confirm(&browser).await;
    let reply = browser.post("/api/booking/submit", json!({})).await;

    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["outcome"], "booked");
    assert_eq!(upstream.state.plan_changes(), vec!["plan-single".to_string()]);
    let booked = upstream.state.bookings();
    assert_eq!(booked.len(), 1);
    assert_eq!(booked[0]["price"], 6000);
    assert_eq!(booked[0]["duration"], 60);

    let reply = browser.get("/api/sessions").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["sessions"]["upcoming"].as_array().unwrap().len(), 1);
    assert_eq!(reply.body["stats"]["total"], 1);
    assert_eq!(reply.body["stats"]["hoursBooked"], 1.0);

    let reply = browser.get("/api/booking").await;
    assert_eq!(reply.body["step"], "service");
}

#[tokio::test]
async fn taken_slot_rewinds_to_datetime_and_is_hidden() {
    let upstream = spawn_upstream().await;
    upstream.state.booking_conflict.store(true, Ordering::SeqCst);
    let portal = spawn_portal(&upstream).await;
    let browser = Browser::new(&portal);

    let date = walk_to_confirm(&browser).await;
    let reply = browser.post("/api/booking/submit", json!({})).await;

    assert_eq!(reply.status, StatusCode::CONFLICT);
    assert_eq!(reply.body["outcome"], "conflict");
    assert_eq!(reply.body["step"], "datetime");
    assert_eq!(reply.body["wizard"]["step"], "datetime");

    let reply = browser.get(&format!("/api/booking/times?date={date}")).await;
    let values: Vec<&str> = reply.body["slots"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|s| s["value"].as_str())
        .collect();
    assert!(!values.contains(&"09:00"));
    assert!(values.contains(&"09:30"));
}
