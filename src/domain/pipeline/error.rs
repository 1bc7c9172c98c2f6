use crate::domain::dialogue::SegmenterError;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Segmenter(#[from] SegmenterError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
