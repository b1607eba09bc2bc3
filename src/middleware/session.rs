use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::AppError;
use crate::state::ClientState;

pub const CLIENT_SESSION_HEADER: &str = "x-client-session";

/// Client session the current request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientSessionId(pub Uuid);

/// Resolves the client session from the `X-Client-Session` header, minting a
/// new one when it is absent or malformed, and echoes it on the response.
///
/// A 401 on the way out evicts everything stored for the session, the same
/// way the browser dropped its saved state on a forced logout.
pub async fn client_session_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let session = session_from_headers(request.headers()).unwrap_or_else(|| {
        let minted = Uuid::new_v4();
        debug!(session = %minted, "Minted client session");
        minted
    });
    request.extensions_mut().insert(ClientSessionId(session));

    let mut response = next.run(request).await;

    if response.status() == StatusCode::UNAUTHORIZED {
        match state.store.clear(session).await {
            Ok(()) => debug!(session = %session, "Evicted client state after authentication failure"),
            Err(e) => warn!(session = %session, error = %e, "Failed to evict client state"),
        }
    }

    if let Ok(value) = HeaderValue::from_str(&session.to_string()) {
        response.headers_mut().insert(CLIENT_SESSION_HEADER, value);
    }
    response
}

pub fn session_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(CLIENT_SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
}

impl FromRequestParts<AppState> for ClientState {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<ClientSessionId>()
            .map(|id| id.0)
            .or_else(|| session_from_headers(&parts.headers))
            .ok_or_else(|| AppError::BadRequest("Missing X-Client-Session header".to_string()))?;
        Ok(ClientState::new(state.store.clone(), session))
    }
}
