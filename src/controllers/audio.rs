use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::{
        pipeline::{AudioPipelineApi, AudioPipelineService, BatchRunResult, BatchStatistics, PipelineError},
        synthesis::LanguageConfig,
    },
    error::{AppError, AppResult},
};

const MAX_TRANSCRIPT_CHARS: usize = 50_000;

/// Request for POST /api/audio/generate
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateAudioRequest {
    pub transcript: String,
    pub subject_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ArtifactDto {
    pub sequence_number: u32,
    pub speaker: String,
    pub audio_url: String,
    pub file_name: String,
    pub duration_seconds: u32,
    pub size_bytes: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateAudioResponse {
    pub run_id: String,
    pub success: bool,
    pub artifacts: Vec<ArtifactDto>,
    pub errors: Vec<String>,
    pub statistics: BatchStatistics,
}

pub struct AudioController {
    pipeline: Arc<AudioPipelineService>,
}

impl AudioController {
    pub fn new(pipeline: Arc<AudioPipelineService>) -> Self {
        Self { pipeline }
    }

    /// POST /api/audio/generate - run the audio-generation pipeline for one
    /// transcript
    pub async fn generate(
        State(controller): State<Arc<AudioController>>,
        Json(request): Json<GenerateAudioRequest>,
    ) -> AppResult<(StatusCode, Json<GenerateAudioResponse>)> {
        if request.transcript.trim().is_empty() {
            return Err(AppError::BadRequest("Transcript cannot be empty".to_string()));
        }
        if request.transcript.chars().count() > MAX_TRANSCRIPT_CHARS {
            return Err(AppError::PayloadTooLarge(format!(
                "Transcript must be {} characters or less",
                MAX_TRANSCRIPT_CHARS
            )));
        }
        if request.subject_name.trim().is_empty() {
            return Err(AppError::BadRequest("Subject name cannot be empty".to_string()));
        }

        let run_id = request
            .run_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let language =
            LanguageConfig::for_language(request.language.as_deref().unwrap_or("ko"));

        let result = controller
            .pipeline
            .generate(&request.transcript, &request.subject_name, &run_id, &language)
            .await
            .map_err(|error| match error {
                PipelineError::Segmenter(e) => AppError::BadRequest(e.to_string()),
                PipelineError::Other(e) => AppError::Internal(e.to_string()),
            })?;

        Ok((StatusCode::OK, Json(Self::to_response(run_id, result))))
    }

    fn to_response(run_id: String, result: BatchRunResult) -> GenerateAudioResponse {
        GenerateAudioResponse {
            run_id,
            success: result.success,
            artifacts: result
                .artifacts
                .into_iter()
                .map(|artifact| ArtifactDto {
                    sequence_number: artifact.sequence_number,
                    speaker: artifact.speaker.to_string(),
                    audio_url: artifact.audio_ref,
                    file_name: artifact.file_name,
                    duration_seconds: artifact.duration_secs,
                    size_bytes: artifact.size_bytes,
                })
                .collect(),
            errors: result.errors,
            statistics: result.statistics,
        }
    }
}
