use crate::domain::dialogue::{DialogueSegment, SpeakerRole};
use serde::{Deserialize, Serialize};

/// One unit of synthesis work, derived 1:1 from a segment.
#[derive(Debug, Clone)]
pub struct SynthesisJob {
    pub segment: DialogueSegment,
    /// Lower sorts sooner
    pub priority: f32,
    /// 1-based position within the segment's chapter, drives the filename
    pub chapter_segment_number: u32,
}

/// Deterministic artifact filename: `"{chapter}-{chapter_segment}{lang2}.mp3"`,
/// e.g. `1-1ko.mp3`. Stable across reruns so uploads overwrite instead of
/// accumulating duplicates.
pub fn artifact_file_name(
    chapter_index: u32,
    chapter_segment_number: u32,
    language_short_code: &str,
) -> String {
    format!(
        "{}-{}{}.mp3",
        chapter_index, chapter_segment_number, language_short_code
    )
}

/// Durable output of one successful job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    pub sequence_number: u32,
    pub speaker: SpeakerRole,
    /// Public reference to the stored audio object
    pub audio_ref: String,
    pub duration_secs: u32,
    pub size_bytes: u64,
    pub file_name: String,
    pub text: String,
    pub chapter_index: u32,
    pub chapter_segment_number: u32,
}

/// Throughput statistics of one batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchStatistics {
    pub total_processing_time_ms: u64,
    pub average_segment_time_ms: u64,
    pub max_concurrency_used: usize,
    pub failure_rate: f64,
    pub throughput_per_second: f64,
}

/// Aggregate output of one orchestrator invocation.
///
/// `artifacts` is always sorted by `sequence_number` regardless of the
/// non-deterministic completion order of concurrent jobs. `success` is true
/// iff the failure rate stays below the configured threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRunResult {
    pub artifacts: Vec<GeneratedArtifact>,
    pub errors: Vec<String>,
    pub statistics: BatchStatistics,
    pub success: bool,
}

impl BatchRunResult {
    /// Result of a run that was aborted before any job was dispatched
    pub fn aborted(reason: String) -> Self {
        Self {
            artifacts: Vec::new(),
            errors: vec![reason],
            statistics: BatchStatistics::default(),
            success: false,
        }
    }
}
