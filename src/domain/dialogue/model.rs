use serde::{Deserialize, Serialize};

/// The two speakers of a guide dialogue, each mapped to a distinct voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeakerRole {
    /// The host / moderator of the dialogue
    Host,
    /// The curator / docent answering the host
    Curator,
}

impl SpeakerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpeakerRole::Host => "host",
            SpeakerRole::Curator => "curator",
        }
    }
}

impl std::fmt::Display for SpeakerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One contiguous utterance by a single speaker.
///
/// Segments are produced in strictly increasing `sequence_number` and no two
/// adjacent segments share a speaker (the segmenter pre-merges them).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueSegment {
    /// 1-based, globally ordered, immutable once assigned
    pub sequence_number: u32,
    pub speaker: SpeakerRole,
    /// Non-empty, trimmed utterance text
    pub text: String,
    /// Clamped to [5, 90] seconds
    pub estimated_duration_secs: u32,
    /// Narrative chapter this segment belongs to (1-based)
    pub chapter_index: u32,
}
