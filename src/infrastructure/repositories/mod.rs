pub mod blob_repository;
pub mod record_repository;
pub mod slug_repository;
pub mod synthesis_repository;

pub use blob_repository::{BlobRepository, HttpBlobRepository};
pub use record_repository::{HttpRecordRepository, RecordRepository};
pub use slug_repository::{HttpSlugRepository, SlugRepository, SlugResolution, SlugSource};
pub use synthesis_repository::{
    HttpSynthesisRepository, SynthesisRepository, SynthesisRequest, SynthesizedAudio,
};
