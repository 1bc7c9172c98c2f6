use crate::domain::synthesis::SynthesisError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};

/// One segment -> one audio payload request against the synthesis endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisRequest {
    pub text: String,
    pub language_code: String,
    pub voice_id: String,
    pub speaking_rate: f32,
    pub pitch: f32,
    pub volume_gain_db: f32,
}

#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub audio: Vec<u8>,
    pub mime_type: String,
}

/// Repository for the external speech-synthesis endpoint.
/// Abstracts the underlying provider behind a single typed contract;
/// any legacy response-shape variance is an adapter concern kept out of
/// the pipeline core.
#[async_trait]
pub trait SynthesisRepository: Send + Sync {
    /// Synthesize one utterance into an audio payload.
    ///
    /// # Errors
    /// Returns a classified `SynthesisError` so the retry policy can
    /// distinguish transient upstream trouble from permanent failures.
    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesizedAudio, SynthesisError>;
}

/// Typed response contract of the synthesis endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesisResponse {
    success: bool,
    audio_base64: Option<String>,
    mime_type: Option<String>,
    error: Option<String>,
}

/// HTTP implementation of the synthesis collaborator
pub struct HttpSynthesisRepository {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpSynthesisRepository {
    pub fn new(client: reqwest::Client, endpoint: String, api_key: String) -> Self {
        Self {
            client,
            endpoint,
            api_key,
        }
    }

    fn classify_status(status: reqwest::StatusCode, body: String) -> SynthesisError {
        match status.as_u16() {
            429 => SynthesisError::RateLimited,
            401 | 403 => SynthesisError::Unauthorized(body),
            400 => SynthesisError::InvalidInput(body),
            code => SynthesisError::Upstream(code),
        }
    }
}

#[async_trait]
impl SynthesisRepository for HttpSynthesisRepository {
    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesizedAudio, SynthesisError> {
        tracing::debug!(
            voice = %request.voice_id,
            language = %request.language_code,
            text_length = request.text.len(),
            "Calling synthesis endpoint"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SynthesisError::Timeout(std::time::Duration::from_secs(30))
                } else {
                    SynthesisError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = status.as_u16(),
                body = %body,
                "Synthesis endpoint returned error status"
            );
            return Err(Self::classify_status(status, body));
        }

        let payload: SynthesisResponse = response
            .json()
            .await
            .map_err(|e| SynthesisError::MalformedResponse(e.to_string()))?;

        if !payload.success {
            let message = payload.error.unwrap_or_else(|| "unknown error".to_string());
            tracing::error!(error = %message, "Synthesis endpoint reported failure");
            return Err(SynthesisError::Upstream(502));
        }

        let encoded = payload
            .audio_base64
            .ok_or_else(|| SynthesisError::MalformedResponse("missing audio payload".to_string()))?;
        let audio = BASE64
            .decode(encoded.as_bytes())
            .map_err(|e| SynthesisError::MalformedResponse(format!("invalid base64: {}", e)))?;

        Ok(SynthesizedAudio {
            audio,
            mime_type: payload.mime_type.unwrap_or_else(|| "audio/mpeg".to_string()),
        })
    }
}
