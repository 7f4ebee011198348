//! Retry policy for remote calls
//!
//! Pure decisions only: the policy computes a backoff delay and whether a
//! failed attempt is worth repeating. It never sleeps or performs I/O; the
//! sync orchestrator honors the returned delay cooperatively.

use std::time::Duration;

use crate::error::Error;

/// Bounded exponential backoff with fatal-error classification
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(60),
            max_retries: 3,
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (zero-based):
    /// `min(initial * multiplier^attempt, max_delay)`
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt.min(64) as i32);
        self.max_delay.min(Duration::from_secs_f64(exp))
    }

    /// Whether a failed attempt should be repeated. Fatal errors
    /// (authentication, validation, unresolved conflicts) are never retried;
    /// anything else is retried until the attempt cap.
    #[must_use]
    pub fn should_retry(&self, error: &Error, attempt: u32) -> bool {
        attempt < self.max_retries && !error.is_fatal()
    }
}
