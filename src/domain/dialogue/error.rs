#[derive(Debug, thiserror::Error)]
pub enum SegmenterError {
    #[error("transcript produced no usable dialogue segments")]
    EmptyTranscript,
}
