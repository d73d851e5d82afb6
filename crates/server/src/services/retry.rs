//! Retry scheduling for email delivery.
//!
//! The policy is pure data: it computes when the next attempt should run,
//! and the queue stores that timestamp. Nothing here sleeps, so tests can
//! assert on schedules directly.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;

/// Exponential backoff policy with jitter.
///
/// Delay after the n-th failed attempt is `min(base * 2^(n-1), max)` plus up
/// to `max_jitter` of random noise so synchronized failures do not retry in
/// lockstep.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    base_delay: Duration,
    max_delay: Duration,
    max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(5 * 60),
            max_jitter: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(base_delay: Duration, max_delay: Duration, max_jitter: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
            max_jitter,
        }
    }

    /// Deterministic backoff after `attempts` failed attempts (1-based).
    #[must_use]
    pub const fn backoff(&self, attempts: u32) -> Duration {
        let n = if attempts == 0 { 1 } else { attempts };
        // Exponent is clamped so the multiplier never overflows u32
        let exp = n - 1;
        let exp = if exp > 30 { 30 } else { exp };

        let delay = self.base_delay.saturating_mul(2u32.pow(exp));
        if delay.as_millis() > self.max_delay.as_millis() {
            self.max_delay
        } else {
            delay
        }
    }

    /// Backoff plus random jitter.
    #[must_use]
    pub fn delay(&self, attempts: u32) -> Duration {
        let jitter_ms = rand::rng().random_range(0..=self.max_jitter.as_millis());
        self.backoff(attempts) + Duration::from_millis(u64::try_from(jitter_ms).unwrap_or(0))
    }

    /// Absolute time the next attempt should run, given the attempt count
    /// just recorded.
    #[must_use]
    pub fn next_attempt_at(&self, now: DateTime<Utc>, attempts: u32) -> DateTime<Utc> {
        let delay = self.delay(attempts);
        now + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::minutes(5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_from_base() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_secs(5));
        assert_eq!(policy.backoff(2), Duration::from_secs(10));
        assert_eq!(policy.backoff(3), Duration::from_secs(20));
        assert_eq!(policy.backoff(4), Duration::from_secs(40));
        assert_eq!(policy.backoff(5), Duration::from_secs(80));
        assert_eq!(policy.backoff(6), Duration::from_secs(160));
    }

    #[test]
    fn test_backoff_caps_at_max_delay() {
        let policy = RetryPolicy::default();
        // 5s * 2^6 = 320s exceeds the 300s cap
        assert_eq!(policy.backoff(7), Duration::from_secs(300));
        assert_eq!(policy.backoff(8), Duration::from_secs(300));
        assert_eq!(policy.backoff(100), Duration::from_secs(300));
        assert_eq!(policy.backoff(u32::MAX), Duration::from_secs(300));
    }

    #[test]
    fn test_backoff_treats_zero_attempts_as_first() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), policy.backoff(1));
    }

    #[test]
    fn test_backoff_is_monotonic() {
        let policy = RetryPolicy::default();
        let mut previous = Duration::ZERO;
        for attempts in 1..128 {
            let delay = policy.backoff(attempts);
            assert!(delay >= previous, "backoff shrank at attempt {attempts}");
            previous = delay;
        }
    }

    #[test]
    fn test_jitter_stays_within_bound() {
        let policy = RetryPolicy::default();
        for attempts in 1..=8 {
            for _ in 0..50 {
                let delta = policy.delay(attempts) - policy.backoff(attempts);
                assert!(delta <= Duration::from_secs(1), "jitter {delta:?} too large");
            }
        }
    }

    #[test]
    fn test_next_attempt_at_is_in_the_future() {
        let policy = RetryPolicy::default();
        let now = Utc::now();
        let next = policy.next_attempt_at(now, 1);
        assert!(next > now);
        assert!(next <= now + chrono::Duration::seconds(6));
    }
}
