use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A single failed attempt against an upstream provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryAttempt {
    /// 1-based attempt number.
    pub attempt: u8,
    /// Error message from the failed attempt.
    pub error: String,
    /// When this attempt failed.
    pub timestamp: DateTime<Utc>,
}

impl RetryAttempt {
    pub fn new(attempt: u8, error: impl Into<String>) -> Self {
        Self {
            attempt,
            error: error.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Result of recording a failure in a [`RetryBudget`].
#[derive(Debug, Clone)]
pub enum RetryDecision {
    /// Another attempt is allowed. `attempt` is the number of the attempt that just failed.
    Retry { attempt: u8 },
    /// The budget is spent; carries every recorded failure.
    Exhausted { history: Vec<RetryAttempt> },
}

/// Attempt bookkeeping for a single call.
///
/// Owned by the calling task, so concurrent calls never share retry state.
#[derive(Debug)]
pub struct RetryBudget {
    max_attempts: u8,
    history: Vec<RetryAttempt>,
}

impl RetryBudget {
    /// Create a budget allowing at most `max_attempts` calls (minimum 1).
    pub fn new(max_attempts: u8) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            history: Vec::new(),
        }
    }

    /// Record a failed attempt and decide whether another one is allowed.
    pub fn record_failure(&mut self, error: impl Into<String>) -> RetryDecision {
        let attempt = self.attempts() + 1;
        self.history.push(RetryAttempt::new(attempt, error));

        if attempt < self.max_attempts {
            RetryDecision::Retry { attempt }
        } else {
            RetryDecision::Exhausted {
                history: std::mem::take(&mut self.history),
            }
        }
    }

    /// Number of failures recorded so far.
    pub fn attempts(&self) -> u8 {
        self.history.len() as u8
    }

    pub fn max_attempts(&self) -> u8 {
        self.max_attempts
    }

    /// Failures recorded so far, oldest first.
    pub fn history(&self) -> &[RetryAttempt] {
        &self.history
    }
}

/// Calculate exponential backoff delay with jitter.
///
/// Formula: `min(base_ms * 2^(attempt-1) + jitter, max_ms)` (0-25% jitter).
/// Below the cap the delay strictly increases with `attempt`.
pub fn calculate_backoff(attempt: u8, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exp_factor = 2u64.saturating_pow((attempt - 1) as u32);
    let delay_ms = base_ms.saturating_mul(exp_factor);

    let jitter = if delay_ms > 0 {
        rand::rng().random_range(0..=delay_ms / 4)
    } else {
        0
    };

    let total_delay = delay_ms.saturating_add(jitter).min(max_ms);
    Duration::from_millis(total_delay)
}
