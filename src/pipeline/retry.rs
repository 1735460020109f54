//! Shared exponential-backoff policy for network retries.
//!
//! Both the listing fetcher and the document downloader retry transient
//! failures with the same schedule: `initial_backoff * 2^(attempt-1)` plus a
//! uniform random jitter of up to 10% of that delay. With the 2 s default
//! the waits are ~2 s → ~4 s → ~8 s. Jitter keeps repeated runs from
//! retrying in lockstep against a recovering endpoint.

use rand::Rng;
use std::time::Duration;

/// Retry schedule shared by all network steps.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Base delay before the first retry.
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
            initial_backoff,
        }
    }

    /// Delay to sleep before retry number `attempt` (1-indexed: the delay
    /// taken after the `attempt`-th failure).
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.initial_backoff.as_millis() as u64;
        let backoff = base.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
        let jitter_cap = backoff / 10;
        let jitter = if jitter_cap == 0 {
            0
        } else {
            rand::rng().random_range(0..=jitter_cap)
        };
        Duration::from_millis(backoff + jitter)
    }

    /// Sleep for the delay of retry number `attempt`.
    pub async fn wait(&self, attempt: u32) {
        tokio::time::sleep(self.delay(attempt)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_exponentially_within_jitter_envelope() {
        let policy = RetryPolicy::new(3, Duration::from_millis(2000));
        for (attempt, base) in [(1u32, 2000u64), (2, 4000), (3, 8000)] {
            let d = policy.delay(attempt).as_millis() as u64;
            assert!(d >= base, "attempt {attempt}: {d} < {base}");
            assert!(d <= base + base / 10, "attempt {attempt}: {d} over envelope");
        }
    }

    #[test]
    fn zero_backoff_yields_zero_delay() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        assert_eq!(policy.delay(1), Duration::ZERO);
        assert_eq!(policy.delay(3), Duration::ZERO);
    }

    #[test]
    fn max_attempts_is_at_least_one() {
        let policy = RetryPolicy::new(0, Duration::from_millis(100));
        assert_eq!(policy.max_attempts, 1);
    }
}
