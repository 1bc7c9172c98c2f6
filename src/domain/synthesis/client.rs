use super::circuit_breaker::{BreakerDecision, CircuitBreaker};
use super::error::SynthesisError;
use super::language::LanguageConfig;
use super::retry::RetryPolicy;
use crate::domain::dialogue::DialogueSegment;
use crate::infrastructure::repositories::{SynthesisRepository, SynthesisRequest, SynthesizedAudio};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Seam between the batch executor and the guarded synthesis call path.
#[async_trait]
pub trait SegmentSynthesizer: Send + Sync {
    /// Synthesize one segment into an audio payload.
    ///
    /// # Errors
    /// Returns the final error class after the retry budget is exhausted, or
    /// `CircuitOpen` immediately when the breaker blocks the attempt.
    async fn synthesize_segment(
        &self,
        segment: &DialogueSegment,
        language: &LanguageConfig,
    ) -> Result<SynthesizedAudio, SynthesisError>;
}

/// Performs one segment -> one audio payload call, composing the retry
/// policy and the shared circuit breaker.
///
/// The breaker is consulted before every attempt; a blocked decision returns
/// immediately without a network call and without consuming retry budget.
/// A half-open trial attempt gets no retries: its failure re-opens the
/// circuit and fails the job. Exactly one `on_failure` is reported per
/// permanently failed job, and a hard per-attempt timeout is enforced
/// independently of retry backoff.
pub struct SynthesisClient {
    repository: Arc<dyn SynthesisRepository>,
    breaker: Arc<CircuitBreaker>,
    retry_policy: RetryPolicy,
    attempt_timeout: Duration,
}

impl SynthesisClient {
    pub fn new(
        repository: Arc<dyn SynthesisRepository>,
        breaker: Arc<CircuitBreaker>,
        retry_policy: RetryPolicy,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            repository,
            breaker,
            retry_policy,
            attempt_timeout,
        }
    }

    async fn attempt(
        &self,
        segment: &DialogueSegment,
        language: &LanguageConfig,
    ) -> Result<SynthesizedAudio, SynthesisError> {
        let request = SynthesisRequest {
            text: segment.text.clone(),
            language_code: language.language_code.clone(),
            voice_id: language.voice_for(segment.speaker).to_string(),
            speaking_rate: language.speaking_rate,
            pitch: language.pitch,
            volume_gain_db: language.volume_gain_db,
        };

        match tokio::time::timeout(self.attempt_timeout, self.repository.synthesize(request)).await
        {
            Ok(result) => result,
            Err(_) => Err(SynthesisError::Timeout(self.attempt_timeout)),
        }
    }
}

#[async_trait]
impl SegmentSynthesizer for SynthesisClient {
    async fn synthesize_segment(
        &self,
        segment: &DialogueSegment,
        language: &LanguageConfig,
    ) -> Result<SynthesizedAudio, SynthesisError> {
        let mut retry_count = 0u32;

        loop {
            let trial = match self.breaker.check_state() {
                BreakerDecision::Proceed => false,
                BreakerDecision::Trial => true,
                BreakerDecision::Blocked { retry_in } => {
                    tracing::warn!(
                        sequence_number = segment.sequence_number,
                        retry_in_secs = retry_in.as_secs(),
                        "Synthesis blocked by open circuit"
                    );
                    // Systemic rejection: no retry consumed, no failure reported
                    return Err(SynthesisError::CircuitOpen(retry_in));
                }
            };

            match self.attempt(segment, language).await {
                Ok(audio) => {
                    self.breaker.on_success();
                    tracing::debug!(
                        sequence_number = segment.sequence_number,
                        audio_size = audio.audio.len(),
                        attempts = retry_count + 1,
                        "Segment synthesized"
                    );
                    return Ok(audio);
                }
                // A failed half-open trial never enters the retry loop: the
                // breaker must hear about it so the circuit re-opens, and a
                // retry would only find the trial slot already taken.
                Err(error) if !trial && self.retry_policy.should_retry(&error, retry_count) => {
                    let delay = self.retry_policy.backoff_delay(retry_count);
                    tracing::warn!(
                        sequence_number = segment.sequence_number,
                        error = %error,
                        retry_count = retry_count,
                        backoff_ms = delay.as_millis() as u64,
                        "Transient synthesis failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    retry_count += 1;
                }
                Err(error) => {
                    self.breaker.on_failure();
                    tracing::error!(
                        sequence_number = segment.sequence_number,
                        error = %error,
                        attempts = retry_count + 1,
                        "Segment failed permanently"
                    );
                    return Err(error);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dialogue::SpeakerRole;
    use crate::domain::synthesis::CircuitBreakerConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn segment() -> DialogueSegment {
        DialogueSegment {
            sequence_number: 1,
            speaker: SpeakerRole::Host,
            text: "hello there".to_string(),
            estimated_duration_secs: 5,
            chapter_index: 1,
        }
    }

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            jitter: Duration::ZERO,
        }
    }

    struct ScriptedRepository {
        calls: AtomicUsize,
        fail_first: usize,
        error: SynthesisError,
    }

    #[async_trait]
    impl SynthesisRepository for ScriptedRepository {
        async fn synthesize(
            &self,
            _request: SynthesisRequest,
        ) -> Result<SynthesizedAudio, SynthesisError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                Err(self.error.clone())
            } else {
                Ok(SynthesizedAudio {
                    audio: vec![1u8; 32],
                    mime_type: "audio/mpeg".to_string(),
                })
            }
        }
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried_to_success() {
        let repository = Arc::new(ScriptedRepository {
            calls: AtomicUsize::new(0),
            fail_first: 2,
            error: SynthesisError::Upstream(503),
        });
        let breaker = Arc::new(CircuitBreaker::default());
        let client = SynthesisClient::new(
            repository.clone(),
            breaker.clone(),
            fast_policy(2),
            Duration::from_secs(1),
        );

        let result = client
            .synthesize_segment(&segment(), &LanguageConfig::default())
            .await;

        assert!(result.is_ok());
        assert_eq!(repository.calls.load(Ordering::SeqCst), 3);
        assert!(!breaker.is_open());
    }

    #[tokio::test]
    async fn test_retry_exhaustion_makes_exactly_max_plus_one_attempts() {
        let repository = Arc::new(ScriptedRepository {
            calls: AtomicUsize::new(0),
            fail_first: usize::MAX,
            error: SynthesisError::Upstream(503),
        });
        let breaker = Arc::new(CircuitBreaker::default());
        let client = SynthesisClient::new(
            repository.clone(),
            breaker,
            fast_policy(2),
            Duration::from_secs(1),
        );

        let result = client
            .synthesize_segment(&segment(), &LanguageConfig::default())
            .await;

        assert!(matches!(result, Err(SynthesisError::Upstream(503))));
        assert_eq!(repository.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_failure_is_not_retried() {
        let repository = Arc::new(ScriptedRepository {
            calls: AtomicUsize::new(0),
            fail_first: usize::MAX,
            error: SynthesisError::InvalidInput("bad text".to_string()),
        });
        let breaker = Arc::new(CircuitBreaker::default());
        let client = SynthesisClient::new(
            repository.clone(),
            breaker,
            fast_policy(2),
            Duration::from_secs(1),
        );

        let result = client
            .synthesize_segment(&segment(), &LanguageConfig::default())
            .await;

        assert!(matches!(result, Err(SynthesisError::InvalidInput(_))));
        assert_eq!(repository.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_open_circuit_blocks_without_a_network_call() {
        let repository = Arc::new(ScriptedRepository {
            calls: AtomicUsize::new(0),
            fail_first: 0,
            error: SynthesisError::Upstream(503),
        });
        let breaker = Arc::new(CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            reset_timeout: Duration::from_secs(60),
            half_open_max_attempts: 1,
        }));
        breaker.on_failure();
        assert!(breaker.is_open());

        let client = SynthesisClient::new(
            repository.clone(),
            breaker,
            fast_policy(2),
            Duration::from_secs(1),
        );

        let result = client
            .synthesize_segment(&segment(), &LanguageConfig::default())
            .await;

        assert!(matches!(result, Err(SynthesisError::CircuitOpen(_))));
        assert_eq!(repository.calls.load(Ordering::SeqCst), 0);
    }

    fn tripped_breaker(reset_timeout: Duration) -> Arc<CircuitBreaker> {
        let breaker = Arc::new(CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            reset_timeout,
            half_open_max_attempts: 1,
        }));
        breaker.on_failure();
        assert!(breaker.is_open());
        breaker
    }

    #[tokio::test]
    async fn test_trial_success_closes_the_circuit_through_the_client() {
        let repository = Arc::new(ScriptedRepository {
            calls: AtomicUsize::new(0),
            fail_first: 0,
            error: SynthesisError::Upstream(503),
        });
        let breaker = tripped_breaker(Duration::from_millis(20));
        let client = SynthesisClient::new(
            repository.clone(),
            breaker.clone(),
            fast_policy(2),
            Duration::from_secs(1),
        );

        tokio::time::sleep(Duration::from_millis(30)).await;
        let result = client
            .synthesize_segment(&segment(), &LanguageConfig::default())
            .await;

        assert!(result.is_ok());
        assert_eq!(repository.calls.load(Ordering::SeqCst), 1);
        assert!(!breaker.is_open());
    }

    #[tokio::test]
    async fn test_trial_transient_failure_reopens_without_retrying() {
        let repository = Arc::new(ScriptedRepository {
            calls: AtomicUsize::new(0),
            fail_first: usize::MAX,
            error: SynthesisError::Upstream(503),
        });
        let breaker = tripped_breaker(Duration::from_millis(20));
        let client = SynthesisClient::new(
            repository.clone(),
            breaker.clone(),
            fast_policy(2),
            Duration::from_secs(1),
        );

        tokio::time::sleep(Duration::from_millis(30)).await;
        let result = client
            .synthesize_segment(&segment(), &LanguageConfig::default())
            .await;

        // The trial 503 fails the job outright instead of burning retries
        // against a half-open circuit
        assert!(matches!(result, Err(SynthesisError::Upstream(503))));
        assert_eq!(repository.calls.load(Ordering::SeqCst), 1);
        assert!(breaker.is_open());
    }

    #[tokio::test]
    async fn test_failed_trials_keep_granting_trials_after_each_timeout() {
        let repository = Arc::new(ScriptedRepository {
            calls: AtomicUsize::new(0),
            fail_first: usize::MAX,
            error: SynthesisError::Upstream(503),
        });
        let breaker = tripped_breaker(Duration::from_millis(20));
        let client = SynthesisClient::new(
            repository.clone(),
            breaker.clone(),
            fast_policy(2),
            Duration::from_secs(1),
        );

        // Each cycle: timeout elapses, one trial reaches the endpoint, the
        // circuit re-opens. A leaked trial slot would block every later cycle
        // with CircuitOpen and no network call.
        for cycle in 1..=3 {
            tokio::time::sleep(Duration::from_millis(30)).await;
            let result = client
                .synthesize_segment(&segment(), &LanguageConfig::default())
                .await;

            assert!(matches!(result, Err(SynthesisError::Upstream(503))));
            assert_eq!(repository.calls.load(Ordering::SeqCst), cycle);
            assert!(breaker.is_open());
        }
    }

    #[tokio::test]
    async fn test_job_failures_trip_the_breaker() {
        let repository = Arc::new(ScriptedRepository {
            calls: AtomicUsize::new(0),
            fail_first: usize::MAX,
            error: SynthesisError::Upstream(500),
        });
        let breaker = Arc::new(CircuitBreaker::default());
        let client = SynthesisClient::new(
            repository,
            breaker.clone(),
            fast_policy(0),
            Duration::from_secs(1),
        );

        for _ in 0..3 {
            let _ = client
                .synthesize_segment(&segment(), &LanguageConfig::default())
                .await;
        }

        assert!(breaker.is_open());
    }
}
