use super::error::SynthesisError;
use rand::Rng;
use std::time::Duration;

/// Decides whether a failed synthesis attempt is worth repeating and how
/// long to wait before the next attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt (2 -> 3 total attempts)
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    pub fn should_retry(&self, error: &SynthesisError, retry_count: u32) -> bool {
        retry_count < self.max_retries && error.is_retryable()
    }

    /// Exponential backoff with jitter:
    /// `min(max_delay, base * 2^retry_count) + random(0, jitter)`.
    /// The jitter avoids synchronized retry storms across concurrent jobs.
    pub fn backoff_delay(&self, retry_count: u32) -> Duration {
        let exponential = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(retry_count))
            .min(self.max_delay);
        let jitter_ms = if self.jitter.is_zero() {
            0
        } else {
            rand::rng().random_range(0..self.jitter.as_millis() as u64)
        };
        exponential + Duration::from_millis(jitter_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_stops_at_max_retries() {
        let policy = RetryPolicy::default();
        let error = SynthesisError::Upstream(503);

        assert!(policy.should_retry(&error, 0));
        assert!(policy.should_retry(&error, 1));
        assert!(!policy.should_retry(&error, 2));
    }

    #[test]
    fn test_permanent_errors_are_never_retried() {
        let policy = RetryPolicy::default();
        let error = SynthesisError::InvalidInput("empty".to_string());

        assert!(!policy.should_retry(&error, 0));
    }

    #[test]
    fn test_backoff_grows_exponentially_within_jitter_bounds() {
        let policy = RetryPolicy::default();

        for retry_count in 0..3 {
            let delay = policy.backoff_delay(retry_count);
            let floor = Duration::from_secs(1 << retry_count);
            assert!(delay >= floor, "delay {:?} below floor {:?}", delay, floor);
            assert!(
                delay < floor + Duration::from_secs(1),
                "delay {:?} exceeds jitter ceiling",
                delay
            );
        }
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy::default();
        let delay = policy.backoff_delay(10);
        assert!(delay <= Duration::from_secs(31));
    }
}
