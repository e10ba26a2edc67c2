//! Fixed-delay retry for single enrichment attempts

use std::time::Duration;

/// How many attempts an item gets and how long to wait between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Always at least 1.
    pub max_attempts: u32,
    /// Pause between two consecutive attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// Result of a retried operation plus the number of attempts it took.
#[derive(Debug)]
pub struct Attempted<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
}

/// Retry a fallible operation with a fixed delay between attempts.
///
/// Logs each failed attempt at debug level and the final failure at warn.
/// The delay is not applied after the last attempt.
pub fn retry_fixed<T, E: std::fmt::Display>(
    label: &str,
    policy: RetryPolicy,
    mut attempt_fn: impl FnMut() -> Result<T, E>,
) -> Attempted<T, E> {
    let max = policy.max_attempts.max(1);
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match attempt_fn() {
            Ok(v) => {
                return Attempted {
                    result: Ok(v),
                    attempts: attempt,
                };
            }
            Err(e) if attempt < max => {
                log::debug!("{label}: attempt {attempt}/{max} failed: {e}, retrying...");
                std::thread::sleep(policy.delay);
            }
            Err(e) => {
                log::warn!("{label}: failed after {attempt} attempts: {e}");
                return Attempted {
                    result: Err(e),
                    attempts: attempt,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::ZERO)
    }

    #[test]
    fn always_failing_uses_every_attempt() {
        let mut calls = 0;
        let out = retry_fixed("row_1", quick(3), || {
            calls += 1;
            Err::<(), _>("boom")
        });
        assert_eq!(calls, 3);
        assert_eq!(out.attempts, 3);
        assert!(out.result.is_err());
    }

    #[test]
    fn stops_on_first_success() {
        let mut calls = 0;
        let out = retry_fixed("row_2", quick(5), || {
            calls += 1;
            if calls < 2 { Err("flaky") } else { Ok(calls) }
        });
        assert_eq!(out.result, Ok(2));
        assert_eq!(out.attempts, 2);
    }

    #[test]
    fn zero_attempts_clamped_to_one() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
        let mut calls = 0;
        let _ = retry_fixed("row_3", RetryPolicy { max_attempts: 0, delay: Duration::ZERO }, || {
            calls += 1;
            Err::<(), _>("nope")
        });
        assert_eq!(calls, 1);
    }

    #[test]
    fn default_policy() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_attempts, 3);
        assert_eq!(p.delay, Duration::from_secs(1));
    }
}
