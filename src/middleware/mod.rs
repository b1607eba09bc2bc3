pub mod auth;
pub mod session;
pub mod tracing;

pub use session::{client_session_middleware, ClientSessionId, CLIENT_SESSION_HEADER};
