pub mod error;
pub mod model;
pub mod segmenter;

pub use error::SegmenterError;
pub use model::{DialogueSegment, SpeakerRole};
pub use segmenter::segment_transcript;
