use std::sync::Arc;
use std::time::Duration;

use crate::api::Marketplace;
use crate::config;
use crate::retry::RetryPolicy;
use crate::state::StateStore;

#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn Marketplace>,
    pub store: Arc<dyn StateStore>,
    pub env: config::Config,
    pub retry: RetryPolicy,
}

impl AppState {
    pub fn new(api: Arc<dyn Marketplace>, store: Arc<dyn StateStore>, env: config::Config) -> Self {
        let retry = RetryPolicy {
            max_attempts: env.booking.retry_max_attempts.max(1),
            base_backoff: Duration::from_millis(env.booking.retry_backoff_ms),
        };
        Self {
            api,
            store,
            env,
            retry,
        }
    }
}
