use super::language::LanguageConfig;
use crate::infrastructure::repositories::{SynthesisRepository, SynthesisRequest};
use std::sync::Arc;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Outcome of a liveness probe against the synthesis endpoint.
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub healthy: bool,
    pub message: String,
}

/// Cheap, cached liveness check of the synthesis endpoint.
///
/// Sends one minimal synthesis request with a short timeout before a batch
/// starts, so a known-down service does not burn the retry budget of every
/// job. The result is cached for `cache_validity` to avoid re-probing when
/// batches are invoked in quick succession.
pub struct HealthProbe {
    repository: Arc<dyn SynthesisRepository>,
    probe_timeout: Duration,
    cache_validity: Duration,
    cached: Mutex<Option<(Instant, HealthStatus)>>,
}

impl HealthProbe {
    pub fn new(
        repository: Arc<dyn SynthesisRepository>,
        probe_timeout: Duration,
        cache_validity: Duration,
    ) -> Self {
        Self {
            repository,
            probe_timeout,
            cache_validity,
            cached: Mutex::new(None),
        }
    }

    pub async fn is_healthy(&self, language: &LanguageConfig) -> HealthStatus {
        {
            let cached = self.cached.lock().unwrap_or_else(|e| e.into_inner());
            if let Some((probed_at, status)) = cached.as_ref() {
                if probed_at.elapsed() < self.cache_validity {
                    tracing::debug!(
                        healthy = status.healthy,
                        age_ms = probed_at.elapsed().as_millis() as u64,
                        "Health probe cache hit"
                    );
                    return status.clone();
                }
            }
        }

        let status = self.probe(language).await;
        let mut cached = self.cached.lock().unwrap_or_else(|e| e.into_inner());
        *cached = Some((Instant::now(), status.clone()));
        status
    }

    async fn probe(&self, language: &LanguageConfig) -> HealthStatus {
        let request = SynthesisRequest {
            text: "ping".to_string(),
            language_code: language.language_code.clone(),
            voice_id: language.host_voice.clone(),
            speaking_rate: language.speaking_rate,
            pitch: language.pitch,
            volume_gain_db: language.volume_gain_db,
        };

        let attempt = tokio::time::timeout(self.probe_timeout, self.repository.synthesize(request));
        match attempt.await {
            Ok(Ok(_)) => {
                tracing::info!("Synthesis endpoint health probe succeeded");
                HealthStatus {
                    healthy: true,
                    message: "synthesis endpoint responding".to_string(),
                }
            }
            Ok(Err(error)) => {
                tracing::warn!(error = %error, "Synthesis endpoint health probe failed");
                HealthStatus {
                    healthy: false,
                    message: format!("synthesis endpoint failing: {}", error),
                }
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.probe_timeout.as_millis() as u64,
                    "Synthesis endpoint health probe timed out"
                );
                HealthStatus {
                    healthy: false,
                    message: format!(
                        "synthesis endpoint did not answer within {}s",
                        self.probe_timeout.as_secs()
                    ),
                }
            }
        }
    }
}
