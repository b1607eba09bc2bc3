use axum::{
    extract::{MatchedPath, Request},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use opentelemetry::{
    global,
    trace::{Span, SpanKind, Status, Tracer},
    KeyValue,
};
use std::time::{Duration, Instant};
use tracing::{info, info_span, warn, Instrument};

use super::session::CLIENT_SESSION_HEADER;

/// Wraps every request in an OpenTelemetry server span and a `tracing` span
/// carrying the route and client session, then logs one completion line.
pub async fn observability_middleware(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| path.clone(), |matched| matched.as_str().to_string());
    let client_session = header_str(request.headers(), CLIENT_SESSION_HEADER).unwrap_or("-").to_string();

    let tracer = global::tracer("tutoring-portal");
    let mut otel_span = tracer
        .span_builder(format!("{method} {route}"))
        .with_kind(SpanKind::Server)
        .with_attributes(request_attributes(&method, &path, &route, &client_session, request.headers()))
        .start(&tracer);

    let request_span = info_span!(
        "request",
        %method,
        %route,
        client_session = %client_session,
        request_id = %uuid::Uuid::now_v7(),
    );

    let response = next.run(request).instrument(request_span.clone()).await;
    let elapsed = started.elapsed();
    let status = response.status().as_u16();

    otel_span.set_attribute(KeyValue::new("http.status_code", i64::from(status)));
    otel_span.set_attribute(KeyValue::new("http.response_time_ms", elapsed.as_millis() as i64));
    otel_span.set_status(span_status(status));
    otel_span.end();

    request_span.in_scope(|| log_completion(status, elapsed));
    response
}

fn request_attributes(
    method: &str,
    path: &str,
    route: &str,
    client_session: &str,
    headers: &HeaderMap,
) -> Vec<KeyValue> {
    let mut attributes = vec![
        KeyValue::new("http.method", method.to_string()),
        KeyValue::new("http.target", path.to_string()),
        KeyValue::new("http.route", route.to_string()),
        KeyValue::new("portal.client_session", client_session.to_string()),
    ];
    if let Some(agent) = header_str(headers, "user-agent") {
        attributes.push(KeyValue::new("http.user_agent", agent.to_string()));
    }
    if let Some(forwarded) = header_str(headers, "x-forwarded-for") {
        attributes.push(KeyValue::new("http.client_ip", forwarded.to_string()));
    }
    attributes
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Only server faults mark the span as failed; 4xx are ordinary outcomes
/// (expired logins, taken slots, validation).
fn span_status(status: u16) -> Status {
    if status >= 500 {
        Status::error(format!("HTTP {status}"))
    } else {
        Status::Ok
    }
}

fn log_completion(status: u16, elapsed: Duration) {
    let latency_ms = elapsed.as_millis() as u64;
    if status >= 500 {
        warn!(status, latency_ms, "Request failed");
    } else {
        info!(status, latency_ms, "Request completed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_server_errors_fail_the_span() {
        assert_eq!(span_status(200), Status::Ok);
        assert_eq!(span_status(409), Status::Ok);
        assert!(matches!(span_status(502), Status::Error { .. }));
    }
}
