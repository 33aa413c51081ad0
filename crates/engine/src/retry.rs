//! Retry policy for conflicting attempts
//!
//! Bounded attempts with capped exponential backoff. Only concurrency
//! conflicts are retried; the engine decides that, not the policy.

use crate::config::{
    DEFAULT_BACKOFF_INITIAL_MS, DEFAULT_BACKOFF_MAX_MS, DEFAULT_BACKOFF_MULTIPLIER,
    DEFAULT_MAX_ATTEMPTS,
};
use std::time::Duration;

/// How many times to try and how long to wait between tries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay after the first conflict
    pub initial_backoff: Duration,
    /// Ceiling for any delay
    pub max_backoff: Duration,
    /// Growth factor per further conflict
    pub multiplier: u32,
}

impl RetryPolicy {
    /// Retry immediately, up to `max_attempts` total attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            multiplier: 1,
        }
    }

    /// Whether another attempt is allowed after `attempt` failed
    pub fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Delay to wait after attempt number `attempt` (1-based) conflicted
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use stockledger_engine::RetryPolicy;
    ///
    /// let policy = RetryPolicy {
    ///     max_attempts: 5,
    ///     initial_backoff: Duration::from_millis(1),
    ///     max_backoff: Duration::from_millis(5),
    ///     multiplier: 2,
    /// };
    /// assert_eq!(policy.backoff(1), Duration::from_millis(1));
    /// assert_eq!(policy.backoff(2), Duration::from_millis(2));
    /// assert_eq!(policy.backoff(3), Duration::from_millis(4));
    /// assert_eq!(policy.backoff(4), Duration::from_millis(5));
    /// ```
    pub fn backoff(&self, attempt: u32) -> Duration {
        if self.initial_backoff.is_zero() {
            return Duration::ZERO;
        }
        let factor = self
            .multiplier
            .max(1)
            .saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: Duration::from_millis(DEFAULT_BACKOFF_INITIAL_MS),
            max_backoff: Duration::from_millis(DEFAULT_BACKOFF_MAX_MS),
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}
