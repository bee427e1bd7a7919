//! Retry policy with capped exponential backoff and optional jitter.

use std::time::Duration;

use crate::error::ConfigError;

/// Immutable retry configuration used by the request coordinator.
///
/// Attempt `n` (0-based) that fails with a retryable error waits
/// `min(base_delay * backoff_factor^n, max_delay)` before attempt `n + 1`.
/// Total attempts are `max_retries + 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
    /// Randomize each delay by +/- 50%.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_millis(10_000),
            backoff_factor: 2.0,
            jitter: false,
        }
    }
}

impl RetryPolicy {
    pub fn exponential(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
            ..Self::default()
        }
    }

    /// Disable retries: every failure is final.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.backoff_factor.is_finite() && self.backoff_factor > 1.0) {
            return Err(ConfigError::InvalidBackoffFactor {
                value: self.backoff_factor,
            });
        }
        Ok(())
    }

    /// Whether a failed attempt (0-based) may be followed by another.
    pub const fn allows_retry_after(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// Delay to wait after failed attempt `attempt` (0-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let seconds = self.base_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        let capped = if seconds.is_finite() {
            seconds.min(self.max_delay.as_secs_f64())
        } else {
            self.max_delay.as_secs_f64()
        };

        let delay = Duration::from_secs_f64(capped.max(0.0));
        if !self.jitter {
            return delay;
        }

        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        let spread = millis / 2;
        let offset = fastrand::u64(0..=spread.saturating_mul(2));
        Duration::from_millis((millis - spread).saturating_add(offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_doubles_from_one_second() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(1_000));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(2_000));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(4_000));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(8_000));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(10_000)); // capped
    }

    #[test]
    fn huge_attempt_numbers_stay_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_attempt(u32::MAX), Duration::from_millis(10_000));
    }

    #[test]
    fn jitter_stays_within_half_of_the_delay() {
        let policy = RetryPolicy::exponential(
            5,
            Duration::from_millis(100),
            Duration::from_secs(1),
        )
        .with_jitter(true);

        for _ in 0..10 {
            for attempt in 0..5 {
                let delay_ms = policy.delay_for_attempt(attempt).as_millis() as f64;
                let expected = (100.0 * 2_f64.powi(attempt as i32)).min(1000.0);
                assert!(delay_ms >= expected * 0.49, "attempt={attempt}, delay_ms={delay_ms}");
                assert!(delay_ms <= expected * 1.51, "attempt={attempt}, delay_ms={delay_ms}");
            }
        }
    }

    #[test]
    fn retry_budget_counts_attempts_from_zero() {
        let policy = RetryPolicy::default();
        assert!(policy.allows_retry_after(0));
        assert!(policy.allows_retry_after(2));
        assert!(!policy.allows_retry_after(3));
        assert!(!RetryPolicy::no_retry().allows_retry_after(0));
    }

    #[test]
    fn rejects_non_growing_backoff_factor() {
        let policy = RetryPolicy {
            backoff_factor: 1.0,
            ..RetryPolicy::default()
        };
        assert!(matches!(
            policy.validate(),
            Err(ConfigError::InvalidBackoffFactor { .. })
        ));
        assert!(RetryPolicy::default().validate().is_ok());
    }
}
