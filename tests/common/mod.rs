#![allow(dead_code)]

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use tutoring_portal::{
    api::ApiClient, app::create_router, app_state::AppState, config::Config, state::MemoryStateStore,
};

pub const GOOD_TOKEN: &str = "good-token";
pub const EXPIRED_TOKEN: &str = "expired-token";

/// Knobs and recordings of the fake marketplace.
#[derive(Default)]
pub struct UpstreamState {
    pub plans_fail: AtomicBool,
    pub booking_conflict: AtomicBool,
    pub bookings: Mutex<Vec<Value>>,
    pub plan_changes: Mutex<Vec<String>>,
}

impl UpstreamState {
    pub fn bookings(&self) -> Vec<Value> {
        self.bookings.lock().unwrap().clone()
    }

    pub fn plan_changes(&self) -> Vec<String> {
        self.plan_changes.lock().unwrap().clone()
    }
}

pub struct Upstream {
    pub base_url: String,
    pub state: Arc<UpstreamState>,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {GOOD_TOKEN}"))
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({"success": false, "message": "Token expired"}))).into_response()
}

async fn plans(State(state): State<Arc<UpstreamState>>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if state.plans_fail.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"message": "database offline"}))).into_response();
    }
    Json(json!({
        "success": true,
        "data": [
            {"_id": "plan-single", "name": "Single Session", "type": "single", "price": 60.0, "duration": 60},
            {"_id": "plan-bundle", "name": "Hour Bundle", "type": "multi_hour", "price": 74.99,
             "duration": 60, "minHours": 1, "maxHours": 20},
            {"_id": "plan-retired", "name": "Retired", "type": "single", "price": 10.0, "isActive": false}
        ]
    }))
    .into_response()
}

async fn change_plan(State(state): State<Arc<UpstreamState>>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let plan_id = body["planId"].as_str().unwrap_or_default().to_string();
    state.plan_changes.lock().unwrap().push(plan_id.clone());
    Json(json!({"success": true, "data": {"planId": plan_id}})).into_response()
}

async fn tutors(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({"tutors": [
        {"_id": "t1", "name": "Ada Lovelace", "subjects": ["Algebra"], "hourlyRate": 60.0}
    ]}))
    .into_response()
}

async fn availability(headers: HeaderMap, Path(tutor_id): Path<String>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let slots: Vec<Value> = (0..7)
        .map(|day| {
            json!({
                "_id": format!("{tutor_id}-{day}"),
                "dayOfWeek": day,
                "startTime": "09:00",
                "endTime": "17:00",
                "recurrence": "weekly",
                "sessionTypes": ["tutoring"]
            })
        })
        .collect();
    Json(json!({"success": true, "data": slots})).into_response()
}

async fn create_booking(
    State(state): State<Arc<UpstreamState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if state.booking_conflict.load(Ordering::SeqCst) {
        return (StatusCode::CONFLICT, Json(json!({"success": false, "message": "Slot already booked"})))
            .into_response();
    }
    let mut bookings = state.bookings.lock().unwrap();
    let booking = json!({
        "_id": format!("b-{}", bookings.len() + 1),
        "tutorId": body["tutorId"],
        "subject": body["subject"],
        "serviceType": body["serviceType"],
        "startTime": body["startTime"],
        "endTime": body["endTime"],
        "duration": body["duration"],
        "status": "confirmed",
        "isPaid": true,
        "price": body["price"],
    });
    bookings.push(booking.clone());
    (StatusCode::CREATED, Json(json!({"success": true, "data": booking}))).into_response()
}

async fn my_bookings(State(state): State<Arc<UpstreamState>>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({"bookings": state.bookings()})).into_response()
}

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve app") });
    addr
}

/// Serve the fake marketplace on an ephemeral local port.
pub async fn spawn_upstream() -> Upstream {
    let state = Arc::new(UpstreamState::default());
    let app = Router::new()
        .route("/plans", get(plans))
        .route("/users/plan/change", post(change_plan))
        .route("/tutors", get(tutors))
        .route("/tutors/{id}/availability", get(availability))
        .route("/bookings", post(create_booking))
        .route("/bookings/my", get(my_bookings))
        .with_state(state.clone());

    let addr = serve(app).await;
    Upstream {
        base_url: format!("http://{addr}"),
        state,
    }
}

/// Serve the portal against `upstream` and return its base URL.
pub async fn spawn_portal(upstream: &Upstream) -> String {
    let config = Config::for_upstream(upstream.base_url.clone());
    let api = ApiClient::new(config.api.base_url.clone(), config.api_timeout());
    let app = create_router(AppState::new(Arc::new(api), Arc::new(MemoryStateStore::new()), config));
    format!("http://{}", serve(app).await)
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// One request to the portal.
pub async fn call(
    portal: &str,
    method: Method,
    path: &str,
    token: Option<&str>,
    session: Option<Uuid>,
    body: Option<Value>,
) -> Reply {
    let mut request = reqwest::Client::new().request(method, format!("{portal}{path}"));
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    if let Some(session) = session {
        request = request.header("x-client-session", session.to_string());
    }
    if let Some(body) = body {
        request = request.json(&body);
    }

    let response = request.send().await.expect("portal request");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.bytes().await.expect("portal body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    Reply { status, headers, body }
}

/// A signed-in browser with its own client session.
pub struct Browser<'a> {
    pub portal: &'a str,
    pub session: Uuid,
}

impl<'a> Browser<'a> {
    pub fn new(portal: &'a str) -> Self {
        Self {
            portal,
            session: Uuid::new_v4(),
        }
    }

    pub async fn get(&self, path: &str) -> Reply {
        call(self.portal, Method::GET, path, Some(GOOD_TOKEN), Some(self.session), None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> Reply {
        call(self.portal, Method::POST, path, Some(GOOD_TOKEN), Some(self.session), Some(body)).await
    }

    pub async fn put(&self, path: &str, body: Value) -> Reply {
        call(self.portal, Method::PUT, path, Some(GOOD_TOKEN), Some(self.session), Some(body)).await
    }
}
