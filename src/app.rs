use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::get,
    Json, Router,
};
use serde_json::json;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::{
    app_state::AppState,
    middleware::{client_session_middleware, tracing::observability_middleware, CLIENT_SESSION_HEADER},
    modules::{
        admin::routes::admin_routes, booking::routes::booking_routes, counseling::routes::counseling_routes,
        payments::routes::payment_routes, plans::routes::plan_routes, sessions::routes::session_routes,
    },
    websocket::websocket_routes,
};

pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(state.env.server.cors_allowed_origin.as_deref());

    let api = Router::new()
        .nest("/plans", plan_routes())
        .nest("/booking", booking_routes())
        .nest("/sessions", session_routes())
        .nest("/payments", payment_routes())
        .nest("/counseling", counseling_routes())
        .nest("/admin", admin_routes());

    Router::new()
        .route("/", get(hello))
        .route("/health", get(health_check))
        .merge(websocket_routes())
        .nest("/api", api)
        .layer(middleware::from_fn_with_state(state.clone(), client_session_middleware))
        .layer(middleware::from_fn(observability_middleware))
        .layer(cors)
        .with_state(state)
}

/// The browser origin gets credentials and the session header; without a
/// configured origin any origin may call, without credentials.
fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let session_header = HeaderName::from_static(CLIENT_SESSION_HEADER);
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, session_header.clone()])
        .expose_headers([session_header]);

    match origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => base.allow_origin(origin).allow_credentials(true),
        Some(Err(e)) => {
            warn!(error = %e, "Ignoring malformed CORS_ALLOWED_ORIGIN");
            base.allow_origin(Any)
        }
        None => base.allow_origin(Any),
    }
}

async fn hello() -> &'static str {
    "Tutoring portal says hello!\n"
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let store_status = match state.store.ping().await {
        Ok(()) => "healthy",
        Err(e) => {
            info!("State store health check failed: {}", e);
            "unhealthy"
        }
    };

    let api_status = match state.api.ping().await {
        Ok(()) => "healthy",
        Err(e) => {
            info!("Marketplace API health check failed: {}", e);
            "unhealthy"
        }
    };

    let telemetry_health = crate::telemetry::telemetry_health_check();
    let timestamp = OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();

    Json(json!({
        "status": "ok",
        "timestamp": timestamp,
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "stateStore": { "backend": state.store.backend(), "status": store_status },
            "marketplaceApi": api_status,
            "telemetry": telemetry_health
        }
    }))
}
