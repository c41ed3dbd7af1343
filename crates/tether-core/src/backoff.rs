//! Attempt-count to delay policies.
//!
//! Two policies share this module:
//!
//! - [`ReconnectBackoff`]: exponential, `base * 2^(attempt - 1)`, used by a
//!   channel between reconnect attempts.
//! - [`RetryBackoff`]: linear, `base * attempt`, used between request
//!   retries, with a longer fixed wait after an HTTP 429.
//!
//! Both are pure: the same attempt always yields the same delay. Attempts are
//! 1-indexed; an attempt of `0` is treated as `1`.

use std::time::Duration;

/// Default number of reconnect attempts before a channel gives up.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Default base delay for reconnect backoff.
pub const DEFAULT_RECONNECT_BASE: Duration = Duration::from_millis(1000);

/// Default ceiling for a single reconnect delay.
pub const DEFAULT_RECONNECT_MAX_DELAY: Duration = Duration::from_secs(60);

/// Default number of request attempts.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base delay for request retries.
pub const DEFAULT_RETRY_BASE: Duration = Duration::from_millis(1000);

/// Exponential backoff for channel reconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectBackoff {
    /// Delay before the first reconnect attempt.
    pub base: Duration,
    /// Reconnect attempts allowed before the channel reports failure.
    pub max_attempts: u32,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl ReconnectBackoff {
    /// Create a policy with the given base delay and attempt budget.
    #[must_use]
    pub const fn new(base: Duration, max_attempts: u32) -> Self {
        Self {
            base,
            max_attempts,
            max_delay: DEFAULT_RECONNECT_MAX_DELAY,
        }
    }

    /// Set the per-delay ceiling.
    #[must_use]
    pub const fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Delay before reconnect attempt `attempt`.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.max(1).saturating_sub(1);
        let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max_delay)
    }

    /// Whether reconnect attempt `attempt` is still within budget.
    #[must_use]
    pub const fn should_retry(&self, attempt: u32) -> bool {
        attempt <= self.max_attempts
    }
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_RECONNECT_BASE, DEFAULT_MAX_RECONNECT_ATTEMPTS)
    }
}

/// Linear backoff for request retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBackoff {
    /// Delay unit; attempt `n` waits `base * n`.
    pub base: Duration,
    /// Total attempts per request, including the first.
    pub max_retries: u32,
}

impl RetryBackoff {
    /// Create a policy with the given base delay and attempt budget.
    #[must_use]
    pub const fn new(base: Duration, max_retries: u32) -> Self {
        Self { base, max_retries }
    }

    /// Delay after failed attempt `attempt`.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base.saturating_mul(attempt.max(1))
    }

    /// Delay after attempt `attempt` was answered with HTTP 429.
    ///
    /// Always one step longer than [`delay`](Self::delay) for the same attempt.
    #[must_use]
    pub fn rate_limited_delay(&self, attempt: u32) -> Duration {
        self.base.saturating_mul(attempt.max(1).saturating_add(1))
    }

    /// Whether another attempt may follow `attempts_made` attempts.
    #[must_use]
    pub const fn has_attempts_left(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_retries
    }
}

impl Default for RetryBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_BASE, DEFAULT_MAX_RETRIES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconnect_delay_doubles() {
        let b = ReconnectBackoff::default();
        assert_eq!(b.delay(1), Duration::from_millis(1000));
        assert_eq!(b.delay(2), Duration::from_millis(2000));
        assert_eq!(b.delay(3), Duration::from_millis(4000));
        assert_eq!(b.delay(5), Duration::from_millis(16_000));
    }

    #[test]
    fn reconnect_delay_is_monotonic() {
        let b = ReconnectBackoff::new(Duration::from_millis(250), 40);
        let mut previous = Duration::ZERO;
        for attempt in 1..=64 {
            let delay = b.delay(attempt);
            assert!(delay >= previous, "attempt {attempt} went backwards");
            previous = delay;
        }
    }

    #[test]
    fn reconnect_delay_capped_at_max() {
        let b = ReconnectBackoff::new(Duration::from_secs(1), 100)
            .with_max_delay(Duration::from_secs(5));
        assert_eq!(b.delay(10), Duration::from_secs(5));
        assert_eq!(b.delay(u32::MAX), Duration::from_secs(5));
    }

    #[test]
    fn reconnect_attempt_zero_treated_as_first() {
        let b = ReconnectBackoff::default();
        assert_eq!(b.delay(0), b.delay(1));
    }

    #[test]
    fn reconnect_budget() {
        let b = ReconnectBackoff::default();
        assert!(b.should_retry(1));
        assert!(b.should_retry(5));
        assert!(!b.should_retry(6));
    }

    #[test]
    fn retry_delay_is_linear() {
        let b = RetryBackoff::default();
        assert_eq!(b.delay(1), Duration::from_millis(1000));
        assert_eq!(b.delay(2), Duration::from_millis(2000));
        assert_eq!(b.delay(3), Duration::from_millis(3000));
    }

    #[test]
    fn rate_limited_delay_is_one_step_longer() {
        let b = RetryBackoff::default();
        assert_eq!(b.rate_limited_delay(1), Duration::from_millis(2000));
        assert_eq!(b.rate_limited_delay(2), Duration::from_millis(3000));
        for attempt in 1..10 {
            assert!(b.rate_limited_delay(attempt) > b.delay(attempt));
        }
    }

    #[test]
    fn retry_budget_counts_first_attempt() {
        let b = RetryBackoff::default();
        assert!(b.has_attempts_left(1));
        assert!(b.has_attempts_left(2));
        assert!(!b.has_attempts_left(3));
    }

    #[test]
    fn zero_base_produces_zero_delay() {
        let r = ReconnectBackoff::new(Duration::ZERO, 3);
        let l = RetryBackoff::new(Duration::ZERO, 3);
        for attempt in 1..10 {
            assert_eq!(r.delay(attempt), Duration::ZERO);
            assert_eq!(l.delay(attempt), Duration::ZERO);
        }
    }
}
