use crate::error::QueueResult;

/// Stateful per-request retry decision with exponential backoff.
///
/// One instance is owned by each [`crate::Request`] — retry state is never shared
/// across requests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    timeout_ms: u64,
    retry_count: u32,
    max_retries: u32,
    backoff_multiplier: f32,
}

/// `(initial_timeout_ms=2500, max_retries=1, backoff_multiplier=1.0)`, matching the
/// defaults a caller gets when it doesn't configure a policy explicitly.
impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::new(2_500, 1, 1.0)
    }
}

impl RetryPolicy {
    /// Build a policy with an explicit initial timeout, retry budget, and backoff
    /// multiplier.
    pub fn new(
        initial_timeout_ms: u64,
        max_retries: u32,
        backoff_multiplier: f32,
    ) -> Self {
        RetryPolicy {
            timeout_ms: initial_timeout_ms,
            retry_count: 0,
            max_retries,
            backoff_multiplier,
        }
    }

    /// The timeout, in milliseconds, to use for the next attempt.
    pub fn current_timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    /// The number of retries already consumed.
    pub fn current_retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Consume one retry attempt and scale the backoff. Returns `Err(last_error)`
    /// once the retry budget is exhausted; `Network` implementations are expected
    /// to treat that as the terminal error to surface.
    pub fn retry(&mut self, last_error: QueueResult<()>) -> QueueResult<()> {
        if self.retry_count >= self.max_retries {
            return last_error;
        }
        self.retry_count += 1;
        self.timeout_ms +=
            (self.timeout_ms as f32 * self.backoff_multiplier) as u64;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueueError;

    #[test]
    fn default_policy_matches_documented_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.current_timeout_ms(), 2_500);
        assert_eq!(policy.current_retry_count(), 0);
    }

    #[test]
    fn retry_monotonicity() {
        let mut policy = RetryPolicy::new(1_000, 3, 1.0);
        for n in 1..=3u32 {
            policy.retry(Ok(())).unwrap();
            assert_eq!(policy.current_retry_count(), n);
            assert_eq!(policy.current_timeout_ms(), 1_000 * 2u64.pow(n));
        }
    }

    #[test]
    fn exhausted_retries_surface_last_error() {
        let mut policy = RetryPolicy::new(1_000, 0, 1.0);
        let err = policy.retry(Err(QueueError::timeout("boom")));
        assert!(err.is_err());
        assert_eq!(policy.current_retry_count(), 0);
    }
}
