use std::future::Future;
use std::time::Duration;

use common::retry::{RetryBudget, RetryDecision, calculate_backoff};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::config::RetryConfig;
use crate::error::{GatewayError, ProviderFailure};

/// Output of a successful [`RetryController::invoke`].
#[derive(Debug)]
pub struct Attempted<T> {
    pub value: T,
    /// 1-based number of the attempt that succeeded.
    pub attempts: u8,
}

/// Runs a provider call with bounded retries for transient failures.
///
/// Waits happen on the caller's task only. Cancelling the token stops the
/// loop at the next suspension point, including mid-wait.
#[derive(Debug, Clone)]
pub struct RetryController {
    max_attempts: u8,
    base_delay_ms: u64,
    max_delay_ms: u64,
}

impl RetryController {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
        }
    }

    pub fn max_attempts(&self) -> u8 {
        self.max_attempts
    }

    /// Delay before the attempt following failed attempt `attempt`.
    fn delay_after(&self, attempt: u8, failure: &ProviderFailure) -> Duration {
        let backoff = calculate_backoff(attempt, self.base_delay_ms, self.max_delay_ms);
        let hinted = failure
            .retry_after()
            .unwrap_or_default()
            .min(Duration::from_millis(self.max_delay_ms));
        backoff.max(hinted)
    }

    /// Call `attempt_fn` until it succeeds, fails fatally, or the budget runs out.
    ///
    /// `attempt_fn` receives the 1-based attempt number.
    pub async fn invoke<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut attempt_fn: F,
    ) -> Result<Attempted<T>, GatewayError>
    where
        F: FnMut(u8) -> Fut,
        Fut: Future<Output = Result<T, ProviderFailure>>,
    {
        let mut budget = RetryBudget::new(self.max_attempts);

        loop {
            let attempt = budget.attempts() + 1;

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(GatewayError::Cancelled),
                outcome = attempt_fn(attempt) => outcome,
            };

            let failure = match outcome {
                Ok(value) => {
                    return Ok(Attempted {
                        value,
                        attempts: attempt,
                    });
                }
                Err(failure) => failure,
            };

            if let ProviderFailure::QuotaExhausted(detail) = &failure {
                warn!(attempt, detail = %detail, "Provider quota exhausted, not retrying");
                return Err(GatewayError::QuotaExceeded);
            }

            if !failure.is_retryable() {
                error!(attempt, error = %failure, "Provider call failed");
                return Err(match failure {
                    ProviderFailure::Protocol(_) => GatewayError::Provider(
                        "The provider returned an unexpected response".into(),
                    ),
                    other => GatewayError::Provider(other.to_string()),
                });
            }

            match budget.record_failure(failure.to_string()) {
                RetryDecision::Retry { attempt } => {
                    let delay = self.delay_after(attempt, &failure);
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %failure,
                        "Retrying provider call"
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(GatewayError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                RetryDecision::Exhausted { history } => {
                    error!(
                        attempts = history.len(),
                        last_error = %failure,
                        "Provider retries exhausted"
                    );
                    return Err(GatewayError::Busy {
                        attempts: history.len() as u8,
                    });
                }
            }
        }
    }
}
