use super::model::GeneratedArtifact;
use crate::infrastructure::repositories::RecordRepository;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Result of persisting artifact metadata: how many records were committed
/// before an optional failure.
#[derive(Debug, Clone)]
pub struct RecordOutcome {
    pub inserted: usize,
    pub error: Option<String>,
}

impl RecordOutcome {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Writes one database record per artifact, in fixed-size batches with a
/// short inter-batch delay to respect the record store's rate limit.
///
/// A failing batch aborts the remaining inserts but preserves the committed
/// count; because uploads are idempotent and names deterministic, rerunning
/// the whole pipeline safely recovers partial persistence.
pub struct MetadataService {
    records: Arc<dyn RecordRepository>,
    table: String,
    batch_size: usize,
    batch_delay: Duration,
}

impl MetadataService {
    pub fn new(
        records: Arc<dyn RecordRepository>,
        table: String,
        batch_size: usize,
        batch_delay: Duration,
    ) -> Self {
        Self {
            records,
            table,
            batch_size: batch_size.max(1),
            batch_delay,
        }
    }

    pub async fn record_artifacts(
        &self,
        run_id: &str,
        artifacts: &[GeneratedArtifact],
    ) -> RecordOutcome {
        let rows: Vec<serde_json::Value> = artifacts
            .iter()
            .map(|artifact| {
                serde_json::json!({
                    "run_id": run_id,
                    "sequence_number": artifact.sequence_number,
                    "speaker": artifact.speaker.as_str(),
                    "audio_url": artifact.audio_ref,
                    "duration_seconds": artifact.duration_secs,
                    "size_bytes": artifact.size_bytes,
                    "file_name": artifact.file_name,
                    "text_content": artifact.text,
                    "chapter_index": artifact.chapter_index,
                    "chapter_segment_number": artifact.chapter_segment_number,
                    "created_at": Utc::now().to_rfc3339(),
                })
            })
            .collect();

        let mut inserted = 0usize;
        let batch_count = rows.len().div_ceil(self.batch_size);

        for (index, batch) in rows.chunks(self.batch_size).enumerate() {
            match self.records.insert_many(&self.table, batch).await {
                Ok(count) => {
                    inserted += count;
                    tracing::debug!(
                        batch_index = index,
                        inserted = inserted,
                        total = rows.len(),
                        "Metadata batch committed"
                    );
                }
                Err(error) => {
                    tracing::error!(
                        batch_index = index,
                        inserted = inserted,
                        error = %error,
                        "Metadata batch failed, aborting remaining inserts"
                    );
                    return RecordOutcome {
                        inserted,
                        error: Some(format!(
                            "metadata persistence incomplete ({}/{} records): {}",
                            inserted,
                            rows.len(),
                            error
                        )),
                    };
                }
            }

            if index + 1 < batch_count && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        tracing::info!(run_id = %run_id, inserted = inserted, "Artifact metadata recorded");
        RecordOutcome {
            inserted,
            error: None,
        }
    }
}
