use crate::domain::dialogue::SpeakerRole;
use serde::{Deserialize, Serialize};

/// Per-language synthesis settings: one distinct voice per speaker role plus
/// the prosody parameters forwarded to the synthesis endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageConfig {
    /// BCP-47 style code, e.g. "ko", "en", "ja"
    pub language_code: String,
    pub host_voice: String,
    pub curator_voice: String,
    pub speaking_rate: f32,
    pub pitch: f32,
    pub volume_gain_db: f32,
}

impl LanguageConfig {
    /// Voice table per supported language. Unknown codes fall back to the
    /// Korean defaults, the primary guide language.
    pub fn for_language(code: &str) -> Self {
        let (language_code, host_voice, curator_voice) = match code {
            "en" => ("en", "en-US-Neural2-D", "en-US-Neural2-F"),
            "ja" => ("ja", "ja-JP-Neural2-C", "ja-JP-Neural2-B"),
            "zh" => ("zh", "cmn-CN-Wavenet-B", "cmn-CN-Wavenet-A"),
            _ => ("ko", "ko-KR-Neural2-C", "ko-KR-Neural2-A"),
        };
        Self {
            language_code: language_code.to_string(),
            host_voice: host_voice.to_string(),
            curator_voice: curator_voice.to_string(),
            speaking_rate: 1.0,
            pitch: 0.0,
            volume_gain_db: 0.0,
        }
    }

    pub fn voice_for(&self, role: SpeakerRole) -> &str {
        match role {
            SpeakerRole::Host => &self.host_voice,
            SpeakerRole::Curator => &self.curator_voice,
        }
    }

    /// Two-letter suffix used in artifact filenames, e.g. "ko" in `1-1ko.mp3`
    pub fn short_code(&self) -> &str {
        let end = self
            .language_code
            .char_indices()
            .nth(2)
            .map(|(i, _)| i)
            .unwrap_or(self.language_code.len());
        &self.language_code[..end]
    }
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self::for_language("ko")
    }
}
