use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::api::ApiError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(250),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    GiveUp,
}

/// Attempt counter for one logical operation.
#[derive(Debug, Clone)]
pub struct RetryState {
    policy: RetryPolicy,
    failures: u32,
}

impl RetryState {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy, failures: 0 }
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Record a failed attempt and decide what happens next. Backoff is linear.
    pub fn on_failure(&mut self, err: &ApiError) -> RetryDecision {
        self.failures += 1;
        if !err.is_retryable() || self.failures >= self.policy.max_attempts {
            return RetryDecision::GiveUp;
        }
        RetryDecision::RetryAfter(self.policy.base_backoff.saturating_mul(self.failures))
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the policy gives up.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut state = RetryState::new(policy.clone());
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => match state.on_failure(&err) {
                RetryDecision::GiveUp => return Err(err),
                RetryDecision::RetryAfter(delay) => {
                    warn!(attempt = state.failures(), error = %err, "Retrying upstream call");
                    tokio::time::sleep(delay).await;
                }
            },
        }
    }
}
