use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Bounded attempt count plus an exponential, capped backoff.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: usize,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the failed attempt number `attempt` (1-based).
    ///
    /// Never decreases as `attempt` grows.
    pub fn delay_after(&self, attempt: usize) -> Duration {
        let multiplier = self.multiplier.max(1.0);
        let exponent = attempt.saturating_sub(1).min(i32::MAX as usize) as i32;
        let delay_ms = self.initial_delay.as_millis() as f64 * multiplier.powi(exponent);
        let max_ms = self.max_delay.as_millis().max(self.initial_delay.as_millis()) as f64;
        Duration::from_millis(delay_ms.min(max_ms) as u64)
    }
}

/// Outcome of a single attempt that did not succeed.
#[derive(Debug)]
pub enum AttemptError<E> {
    /// Worth another try after backing off.
    Transient(E),
    /// Retrying cannot help.
    Permanent(E),
}

/// Why [`with_retry`] gave up.
#[derive(Debug)]
pub enum RetryError<E> {
    Exhausted { attempts: usize, last: E },
    Permanent { attempt: usize, error: E },
}

/// Retries an async operation while it fails transiently
///
/// # Parameters
/// - `operation`: Closure returning a future, called once per attempt
/// - `policy`: Attempt budget and backoff between attempts
///
/// # Returns
/// Either the successful result, the first permanent error, or the last
/// transient error once the budget is spent. No delay follows the last attempt.
pub async fn with_retry<F, Fut, T, E>(mut operation: F, policy: &RetryPolicy) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AttemptError<E>>>,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(AttemptError::Permanent(error)) => {
                debug!("Attempt {}/{} failed permanently: {}", attempt, max_attempts, error);
                return Err(RetryError::Permanent { attempt, error });
            }
            Err(AttemptError::Transient(err)) => {
                if attempt >= max_attempts {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: err,
                    });
                }
                let delay = policy.delay_after(attempt);
                warn!(
                    "Attempt {}/{} failed: {}. Retrying in {:?}...",
                    attempt, max_attempts, err, delay
                );
                attempt += 1;
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_policy(max_attempts: usize) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            multiplier: 2.0,
        }
    }

    #[test]
    fn test_backoff_is_non_decreasing_and_capped() {
        let policy = RetryPolicy::default();
        let delays: Vec<Duration> = (1..=8).map(|n| policy.delay_after(n)).collect();

        assert_eq!(delays[0], Duration::from_secs(2));
        assert_eq!(delays[1], Duration::from_secs(4));
        assert_eq!(delays[3], Duration::from_secs(16));
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*delays.last().unwrap(), Duration::from_secs(60));
    }

    #[test]
    fn test_fixed_backoff_with_unit_multiplier() {
        let policy = RetryPolicy {
            multiplier: 1.0,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_after(1), policy.delay_after(4));

        // A shrinking multiplier is clamped to a fixed delay
        let policy = RetryPolicy {
            multiplier: 0.5,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_after(3), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicUsize::new(0);
        let result = with_retry(
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(AttemptError::Transient(format!("failure {n}")))
                } else {
                    Ok(n)
                }
            },
            &fast_policy(5),
        )
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausts_attempt_budget() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> = with_retry(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AttemptError::Transient("boom"))
            },
            &fast_policy(5),
        )
        .await;

        match result {
            Err(RetryError::Exhausted { attempts, last }) => {
                assert_eq!(attempts, 5);
                assert_eq!(last, "boom");
            }
            other => panic!("Expected exhaustion, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_permanent_error_stops_immediately() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> = with_retry(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AttemptError::Permanent("bad request"))
            },
            &fast_policy(5),
        )
        .await;

        assert!(matches!(
            result,
            Err(RetryError::Permanent { attempt: 1, error: "bad request" })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
