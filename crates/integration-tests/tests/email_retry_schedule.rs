//! Backoff schedule tests for the durable email queue.
//!
//! The queue never sleeps; it stores the next attempt time and the scheduler
//! claims whatever is due. That makes the whole schedule testable as data.

use std::time::Duration;

use chrono::{TimeZone, Utc};
use salonkit_server::services::retry::RetryPolicy;

/// Fixed clock for absolute-time assertions.
fn fixed_now() -> chrono::DateTime<Utc> {
    Utc.timestamp_opt(1_750_000_000, 0).single().expect("valid")
}

#[test]
fn test_default_schedule_for_an_entry_with_three_attempts() {
    // The claim step counts the attempt, so after the n-th failure the
    // policy is asked with attempts = n. An entry allowed three attempts
    // consults it twice; the third failure dead-letters instead.
    let policy = RetryPolicy::default();

    let first_retry = policy.delay(1);
    assert!(first_retry >= Duration::from_secs(5));
    assert!(first_retry <= Duration::from_secs(6), "base 5s plus at most 1s jitter");

    let second_retry = policy.delay(2);
    assert!(second_retry >= Duration::from_secs(10));
    assert!(second_retry <= Duration::from_secs(11), "doubled plus at most 1s jitter");
}

#[test]
fn test_deterministic_backoff_doubles_and_caps() {
    let policy = RetryPolicy::default();

    let expected = [5u64, 10, 20, 40, 80, 160, 300, 300];
    for (i, secs) in expected.into_iter().enumerate() {
        let attempts = u32::try_from(i).expect("small index") + 1;
        assert_eq!(
            policy.backoff(attempts),
            Duration::from_secs(secs),
            "attempt {attempts}"
        );
    }
}

#[test]
fn test_schedule_never_shrinks_across_attempts() {
    let policy = RetryPolicy::default();
    let mut previous = Duration::ZERO;
    for attempts in 1..=64 {
        let backoff = policy.backoff(attempts);
        assert!(backoff >= previous, "schedule shrank at attempt {attempts}");
        previous = backoff;
    }
}

#[test]
fn test_next_attempt_at_lands_inside_the_jitter_window() {
    let policy = RetryPolicy::default();
    let now = fixed_now();

    for attempts in 1..=6 {
        let next = policy.next_attempt_at(now, attempts);
        let earliest = now
            + chrono::Duration::from_std(policy.backoff(attempts)).expect("fits");
        let latest = earliest + chrono::Duration::seconds(1);

        assert!(next >= earliest, "attempt {attempts}: {next} before {earliest}");
        assert!(next <= latest, "attempt {attempts}: {next} after {latest}");
    }
}

#[test]
fn test_custom_policy_without_jitter_is_exact() {
    let policy = RetryPolicy::new(
        Duration::from_secs(1),
        Duration::from_secs(4),
        Duration::ZERO,
    );

    assert_eq!(policy.delay(1), Duration::from_secs(1));
    assert_eq!(policy.delay(2), Duration::from_secs(2));
    assert_eq!(policy.delay(3), Duration::from_secs(4));
    assert_eq!(policy.delay(4), Duration::from_secs(4), "capped");

    let now = fixed_now();
    assert_eq!(
        policy.next_attempt_at(now, 2),
        now + chrono::Duration::seconds(2)
    );
}
