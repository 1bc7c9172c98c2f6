pub mod error;
pub mod executor;
pub mod metadata;
pub mod model;
pub mod orchestrator;
pub mod scheduler;
pub mod uploader;

pub use error::PipelineError;
pub use executor::{BatchConfig, BatchExecutor, LogProgress, ProgressReporter};
pub use metadata::{MetadataService, RecordOutcome};
pub use model::{artifact_file_name, BatchRunResult, BatchStatistics, GeneratedArtifact, SynthesisJob};
pub use orchestrator::{AudioPipelineApi, AudioPipelineService};
pub use scheduler::schedule;
pub use uploader::{ArtifactUploader, UploadError, UploadService, UploadedObject};
