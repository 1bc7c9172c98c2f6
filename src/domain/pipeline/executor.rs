use super::model::{
    artifact_file_name, BatchRunResult, BatchStatistics, GeneratedArtifact, SynthesisJob,
};
use super::uploader::ArtifactUploader;
use crate::domain::synthesis::{LanguageConfig, SegmentSynthesizer};
use futures::future::join_all;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// Pacing and limit knobs of one batch run. The upstream synthesis API
/// enforces an undocumented rate limit that shows up as 429/503 under
/// sustained concurrency, hence the two-level bound: per-chunk concurrency
/// plus an inter-chunk cooldown.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub max_concurrency: usize,
    pub chunk_size: usize,
    /// Start delay per worker index within a chunk, avoids a thundering herd
    pub worker_stagger: Duration,
    /// Pause between chunks to let the upstream recover headroom
    pub chunk_cooldown: Duration,
    /// A run is successful while `errors < threshold * total`
    pub failure_rate_threshold: f64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 3,
            chunk_size: 8,
            worker_stagger: Duration::from_millis(200),
            chunk_cooldown: Duration::from_secs(2),
            failure_rate_threshold: 0.1,
        }
    }
}

/// Consumer of per-chunk progress updates, e.g. an external progress UI.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, completed: usize, total: usize, percentage: f64);
}

/// Default reporter: structured log line per chunk
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report(&self, completed: usize, total: usize, percentage: f64) {
        tracing::info!(
            completed = completed,
            total = total,
            percentage = format!("{:.1}", percentage),
            "Batch progress"
        );
    }
}

/// Runs priority-sorted jobs in fixed-size chunks under a bounded worker
/// pool, collecting successes, errors and throughput statistics.
///
/// A single job's failure never aborts the batch: it is recorded in `errors`
/// and excluded from `artifacts`. Artifacts are emitted sorted by
/// `sequence_number` regardless of completion order.
pub struct BatchExecutor {
    synthesizer: Arc<dyn SegmentSynthesizer>,
    uploader: Arc<dyn ArtifactUploader>,
    progress: Arc<dyn ProgressReporter>,
    config: BatchConfig,
}

impl BatchExecutor {
    pub fn new(
        synthesizer: Arc<dyn SegmentSynthesizer>,
        uploader: Arc<dyn ArtifactUploader>,
        progress: Arc<dyn ProgressReporter>,
        config: BatchConfig,
    ) -> Self {
        Self {
            synthesizer,
            uploader,
            progress,
            config,
        }
    }

    pub async fn run_batch(
        &self,
        jobs: Vec<SynthesisJob>,
        language: &LanguageConfig,
        folder_path: &str,
    ) -> BatchRunResult {
        let total = jobs.len();
        if total == 0 {
            return BatchRunResult {
                artifacts: Vec::new(),
                errors: Vec::new(),
                statistics: BatchStatistics::default(),
                success: true,
            };
        }

        let started = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let in_flight = AtomicUsize::new(0);
        let max_in_flight = AtomicUsize::new(0);

        let mut artifacts: Vec<GeneratedArtifact> = Vec::with_capacity(total);
        let mut errors: Vec<String> = Vec::new();
        let mut segment_times: Vec<Duration> = Vec::with_capacity(total);
        let mut completed = 0usize;

        let chunk_size = self.config.chunk_size.max(1);
        let chunk_count = total.div_ceil(chunk_size);

        for (chunk_index, chunk) in jobs.chunks(chunk_size).enumerate() {
            tracing::debug!(
                chunk_index = chunk_index,
                chunk_jobs = chunk.len(),
                "Starting batch chunk"
            );

            let workers = chunk.iter().enumerate().map(|(worker_index, job)| {
                let semaphore = semaphore.clone();
                let in_flight = &in_flight;
                let max_in_flight = &max_in_flight;
                async move {
                    tokio::time::sleep(self.config.worker_stagger * worker_index as u32).await;

                    let sequence_number = job.segment.sequence_number;
                    let _permit = match semaphore.acquire().await {
                        Ok(permit) => permit,
                        Err(_) => {
                            return Err(format!("segment {}: worker pool closed", sequence_number))
                        }
                    };
                    let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    max_in_flight.fetch_max(current, Ordering::SeqCst);

                    let job_started = Instant::now();
                    let outcome = self.run_job(job, language, folder_path).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);

                    outcome.map(|artifact| (artifact, job_started.elapsed()))
                }
            });

            for result in join_all(workers).await {
                match result {
                    Ok((artifact, elapsed)) => {
                        segment_times.push(elapsed);
                        artifacts.push(artifact);
                    }
                    Err(message) => errors.push(message),
                }
            }

            completed += chunk.len();
            let percentage = completed as f64 / total as f64 * 100.0;
            self.progress.report(completed, total, percentage);

            if chunk_index + 1 < chunk_count && !self.config.chunk_cooldown.is_zero() {
                tokio::time::sleep(self.config.chunk_cooldown).await;
            }
        }

        // Completion order is non-deterministic, emission order is not
        artifacts.sort_by_key(|artifact| artifact.sequence_number);

        let total_elapsed = started.elapsed();
        let statistics = Self::statistics(
            total,
            &segment_times,
            errors.len(),
            total_elapsed,
            max_in_flight.load(Ordering::SeqCst),
        );
        let success = (errors.len() as f64) < self.config.failure_rate_threshold * total as f64;

        tracing::info!(
            artifacts = artifacts.len(),
            errors = errors.len(),
            total_ms = statistics.total_processing_time_ms,
            max_concurrency = statistics.max_concurrency_used,
            success = success,
            "Batch run finished"
        );

        BatchRunResult {
            artifacts,
            errors,
            statistics,
            success,
        }
    }

    async fn run_job(
        &self,
        job: &SynthesisJob,
        language: &LanguageConfig,
        folder_path: &str,
    ) -> Result<GeneratedArtifact, String> {
        let sequence_number = job.segment.sequence_number;

        let audio = self
            .synthesizer
            .synthesize_segment(&job.segment, language)
            .await
            .map_err(|error| format!("segment {}: {}", sequence_number, error))?;

        let file_name = artifact_file_name(
            job.segment.chapter_index,
            job.chapter_segment_number,
            language.short_code(),
        );
        let uploaded = self
            .uploader
            .upload(&audio.audio, folder_path, &file_name)
            .await
            .map_err(|error| format!("segment {}: {}", sequence_number, error))?;

        Ok(GeneratedArtifact {
            sequence_number,
            speaker: job.segment.speaker,
            audio_ref: uploaded.public_ref,
            duration_secs: job.segment.estimated_duration_secs,
            size_bytes: uploaded.size_bytes,
            file_name,
            text: job.segment.text.clone(),
            chapter_index: job.segment.chapter_index,
            chapter_segment_number: job.chapter_segment_number,
        })
    }

    fn statistics(
        total: usize,
        segment_times: &[Duration],
        error_count: usize,
        total_elapsed: Duration,
        max_concurrency_used: usize,
    ) -> BatchStatistics {
        let average_segment_time_ms = if segment_times.is_empty() {
            0
        } else {
            let sum: Duration = segment_times.iter().sum();
            (sum / segment_times.len() as u32).as_millis() as u64
        };
        let total_secs = total_elapsed.as_secs_f64();
        let throughput_per_second = if total_secs > 0.0 {
            segment_times.len() as f64 / total_secs
        } else {
            0.0
        };

        BatchStatistics {
            total_processing_time_ms: total_elapsed.as_millis() as u64,
            average_segment_time_ms,
            max_concurrency_used,
            failure_rate: error_count as f64 / total as f64,
            throughput_per_second,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dialogue::{DialogueSegment, SpeakerRole};
    use crate::domain::synthesis::SynthesisError;
    use crate::domain::pipeline::uploader::{UploadError, UploadedObject};
    use crate::infrastructure::repositories::SynthesizedAudio;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    fn jobs(count: u32) -> Vec<SynthesisJob> {
        (1..=count)
            .map(|sequence_number| SynthesisJob {
                segment: DialogueSegment {
                    sequence_number,
                    speaker: if sequence_number % 2 == 1 {
                        SpeakerRole::Host
                    } else {
                        SpeakerRole::Curator
                    },
                    text: format!("utterance number {}", sequence_number),
                    estimated_duration_secs: 10,
                    chapter_index: 1,
                },
                priority: sequence_number as f32,
                chapter_segment_number: sequence_number,
            })
            .collect()
    }

    fn fast_config(max_concurrency: usize) -> BatchConfig {
        BatchConfig {
            max_concurrency,
            chunk_size: 8,
            worker_stagger: Duration::ZERO,
            chunk_cooldown: Duration::ZERO,
            failure_rate_threshold: 0.1,
        }
    }

    /// Synthesizer failing for a chosen set of sequence numbers, tracking the
    /// peak number of concurrent calls
    struct MockSynthesizer {
        fail_sequences: HashSet<u32>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl MockSynthesizer {
        fn new(fail_sequences: impl IntoIterator<Item = u32>) -> Self {
            Self {
                fail_sequences: fail_sequences.into_iter().collect(),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SegmentSynthesizer for MockSynthesizer {
        async fn synthesize_segment(
            &self,
            segment: &DialogueSegment,
            _language: &LanguageConfig,
        ) -> Result<SynthesizedAudio, SynthesisError> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_sequences.contains(&segment.sequence_number) {
                Err(SynthesisError::Upstream(503))
            } else {
                Ok(SynthesizedAudio {
                    audio: vec![0u8; 64],
                    mime_type: "audio/mpeg".to_string(),
                })
            }
        }
    }

    struct MockUploader;

    #[async_trait]
    impl ArtifactUploader for MockUploader {
        async fn upload(
            &self,
            payload: &[u8],
            folder_path: &str,
            file_name: &str,
        ) -> Result<UploadedObject, UploadError> {
            Ok(UploadedObject {
                public_ref: format!("mem://{}/{}", folder_path, file_name),
                size_bytes: payload.len() as u64,
            })
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        updates: Mutex<Vec<(usize, usize)>>,
    }

    impl ProgressReporter for RecordingProgress {
        fn report(&self, completed: usize, total: usize, _percentage: f64) {
            self.updates.lock().unwrap().push((completed, total));
        }
    }

    fn make_executor(
        synthesizer: Arc<MockSynthesizer>,
        progress: Arc<dyn ProgressReporter>,
        config: BatchConfig,
    ) -> BatchExecutor {
        BatchExecutor::new(synthesizer, Arc::new(MockUploader), progress, config)
    }

    #[tokio::test]
    async fn test_artifacts_are_sorted_by_sequence_number() {
        let synthesizer = Arc::new(MockSynthesizer::new([]));
        let executor = make_executor(synthesizer, Arc::new(LogProgress), fast_config(4));

        let result = executor
            .run_batch(jobs(20), &LanguageConfig::default(), "palace")
            .await;

        assert!(result.success);
        assert_eq!(result.artifacts.len(), 20);
        let sequences: Vec<u32> = result.artifacts.iter().map(|a| a.sequence_number).collect();
        assert_eq!(sequences, (1..=20).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_the_bound() {
        let synthesizer = Arc::new(MockSynthesizer::new([]));
        let executor = make_executor(synthesizer.clone(), Arc::new(LogProgress), fast_config(3));

        executor
            .run_batch(jobs(24), &LanguageConfig::default(), "palace")
            .await;

        assert!(synthesizer.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_the_batch() {
        let synthesizer = Arc::new(MockSynthesizer::new([3]));
        let executor = make_executor(synthesizer, Arc::new(LogProgress), fast_config(4));

        let result = executor
            .run_batch(jobs(5), &LanguageConfig::default(), "palace")
            .await;

        assert_eq!(result.artifacts.len(), 4);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("segment 3"));
        assert!(result.artifacts.iter().all(|a| a.sequence_number != 3));
    }

    #[tokio::test]
    async fn test_success_threshold_at_ten_percent() {
        // 9 of 100 failures: below threshold
        let synthesizer = Arc::new(MockSynthesizer::new(1..=9));
        let executor = make_executor(synthesizer, Arc::new(LogProgress), fast_config(8));
        let result = executor
            .run_batch(jobs(100), &LanguageConfig::default(), "palace")
            .await;
        assert!(result.success);
        assert_eq!(result.errors.len(), 9);

        // 11 of 100 failures: above threshold
        let synthesizer = Arc::new(MockSynthesizer::new(1..=11));
        let executor = make_executor(synthesizer, Arc::new(LogProgress), fast_config(8));
        let result = executor
            .run_batch(jobs(100), &LanguageConfig::default(), "palace")
            .await;
        assert!(!result.success);
        assert_eq!(result.errors.len(), 11);
    }

    #[tokio::test]
    async fn test_progress_is_reported_per_chunk() {
        let progress = Arc::new(RecordingProgress::default());
        let synthesizer = Arc::new(MockSynthesizer::new([]));
        let executor = make_executor(synthesizer, progress.clone(), fast_config(4));

        executor
            .run_batch(jobs(20), &LanguageConfig::default(), "palace")
            .await;

        let updates = progress.updates.lock().unwrap();
        assert_eq!(updates.as_slice(), &[(8, 20), (16, 20), (20, 20)]);
    }

    #[tokio::test]
    async fn test_statistics_reflect_the_run() {
        let synthesizer = Arc::new(MockSynthesizer::new([2]));
        let executor = make_executor(synthesizer, Arc::new(LogProgress), fast_config(4));

        let result = executor
            .run_batch(jobs(10), &LanguageConfig::default(), "palace")
            .await;

        assert!((result.statistics.failure_rate - 0.1).abs() < f64::EPSILON);
        assert!(result.statistics.total_processing_time_ms > 0);
        assert!(result.statistics.average_segment_time_ms > 0);
        assert!(result.statistics.max_concurrency_used >= 1);
        assert!(result.statistics.max_concurrency_used <= 4);
        assert!(result.statistics.throughput_per_second > 0.0);
    }

    #[tokio::test]
    async fn test_empty_job_list_short_circuits() {
        let synthesizer = Arc::new(MockSynthesizer::new([]));
        let executor = make_executor(synthesizer, Arc::new(LogProgress), fast_config(4));

        let result = executor
            .run_batch(Vec::new(), &LanguageConfig::default(), "palace")
            .await;

        assert!(result.success);
        assert!(result.artifacts.is_empty());
        assert!(result.errors.is_empty());
    }
}
