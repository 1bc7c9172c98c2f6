use super::error::PipelineError;
use super::executor::BatchExecutor;
use super::metadata::MetadataService;
use super::model::BatchRunResult;
use super::scheduler::schedule;
use crate::domain::dialogue::segment_transcript;
use crate::domain::synthesis::{HealthProbe, LanguageConfig};
use crate::infrastructure::repositories::{slug_repository::slugify, SlugRepository};
use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

/// Composes the whole pipeline: health probe, slug resolution, segmentation,
/// scheduling, batch execution and metadata persistence.
pub struct AudioPipelineService {
    probe: Arc<HealthProbe>,
    slugs: Arc<dyn SlugRepository>,
    executor: Arc<BatchExecutor>,
    metadata: Arc<MetadataService>,
    slug_cache: Cache<String, String>,
}

#[async_trait]
pub trait AudioPipelineApi: Send + Sync {
    /// Turn one transcript into durable audio artifacts.
    ///
    /// This operation:
    /// - Probes the synthesis endpoint and aborts the run while it is down
    /// - Resolves a stable folder slug for the subject
    /// - Segments, schedules and executes all synthesis jobs
    /// - Records artifact metadata when the batch succeeds
    ///
    /// Partial success (most segments produced, a few failed) is a valid
    /// terminal state reported through `errors`, not an `Err`. Only an
    /// unusable transcript is a hard failure.
    async fn generate(
        &self,
        transcript: &str,
        subject_name: &str,
        run_id: &str,
        language: &LanguageConfig,
    ) -> Result<BatchRunResult, PipelineError>;
}

impl AudioPipelineService {
    pub fn new(
        probe: Arc<HealthProbe>,
        slugs: Arc<dyn SlugRepository>,
        executor: Arc<BatchExecutor>,
        metadata: Arc<MetadataService>,
    ) -> Self {
        let slug_cache = Cache::builder()
            .max_capacity(500)
            .time_to_idle(Duration::from_secs(30 * 60))
            .build();
        Self {
            probe,
            slugs,
            executor,
            metadata,
            slug_cache,
        }
    }

    /// Stable folder slug for the subject, resolved through the naming
    /// collaborator with a deterministic local fallback, cached per
    /// subject+language.
    async fn resolve_folder(&self, subject_name: &str, language_code: &str) -> String {
        let cache_key = format!("{}|{}", subject_name, language_code);
        if let Some(slug) = self.slug_cache.get(&cache_key).await {
            return slug;
        }

        let slug = match self.slugs.resolve_slug(subject_name, language_code).await {
            Ok(resolution) => {
                tracing::debug!(
                    subject = %subject_name,
                    slug = %resolution.slug,
                    source = ?resolution.source,
                    "Slug resolved"
                );
                resolution.slug
            }
            Err(error) => {
                let fallback = slugify(subject_name);
                tracing::warn!(
                    subject = %subject_name,
                    error = %error,
                    fallback = %fallback,
                    "Slug resolver unavailable, using local fallback"
                );
                fallback
            }
        };

        self.slug_cache.insert(cache_key, slug.clone()).await;
        slug
    }
}

#[async_trait]
impl AudioPipelineApi for AudioPipelineService {
    async fn generate(
        &self,
        transcript: &str,
        subject_name: &str,
        run_id: &str,
        language: &LanguageConfig,
    ) -> Result<BatchRunResult, PipelineError> {
        tracing::info!(
            run_id = %run_id,
            subject = %subject_name,
            language = %language.language_code,
            transcript_length = transcript.len(),
            "Audio generation run started"
        );

        // 1. Probe the synthesis endpoint; a down service aborts the whole
        // run before any retry budget is spent
        let health = self.probe.is_healthy(language).await;
        if !health.healthy {
            tracing::warn!(
                run_id = %run_id,
                message = %health.message,
                "Aborting run, synthesis endpoint unhealthy"
            );
            return Ok(BatchRunResult::aborted(format!(
                "run aborted: {}",
                health.message
            )));
        }

        // 2. Stable folder for the subject
        let folder_path = self.resolve_folder(subject_name, &language.language_code).await;

        // 3. Segment and schedule
        let segments = segment_transcript(transcript)?;
        let jobs = schedule(segments);

        // 4. Execute the batch
        let mut result = self.executor.run_batch(jobs, language, &folder_path).await;

        // 5. Persist metadata for a successful batch; a recorder failure is
        // merged into the run's errors (reruns recover it safely)
        if result.success && !result.artifacts.is_empty() {
            let outcome = self.metadata.record_artifacts(run_id, &result.artifacts).await;
            if let Some(error) = outcome.error {
                result.errors.push(error);
            }
        }

        tracing::info!(
            run_id = %run_id,
            artifacts = result.artifacts.len(),
            errors = result.errors.len(),
            success = result.success,
            "Audio generation run finished"
        );

        Ok(result)
    }
}
