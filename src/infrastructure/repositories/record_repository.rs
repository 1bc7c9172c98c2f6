use async_trait::async_trait;

/// Repository for the record store holding one metadata row per artifact.
#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// Insert a batch of records into `table`, returning how many were
    /// accepted. Inserts use merge-duplicates semantics so pipeline reruns
    /// are idempotent end to end.
    async fn insert_many(
        &self,
        table: &str,
        records: &[serde_json::Value],
    ) -> Result<usize, String>;
}

/// HTTP implementation of the record-store collaborator
pub struct HttpRecordRepository {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpRecordRepository {
    pub fn new(client: reqwest::Client, base_url: String, api_key: String) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }
}

#[async_trait]
impl RecordRepository for HttpRecordRepository {
    async fn insert_many(
        &self,
        table: &str,
        records: &[serde_json::Value],
    ) -> Result<usize, String> {
        if records.is_empty() {
            return Ok(0);
        }

        let response = self
            .client
            .post(format!("{}/rest/v1/{}", self.base_url, table))
            .bearer_auth(&self.api_key)
            .header("apikey", &self.api_key)
            .header("prefer", "resolution=merge-duplicates,return=minimal")
            .json(records)
            .send()
            .await
            .map_err(|e| format!("record store request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = status.as_u16(),
                table = %table,
                batch_size = records.len(),
                body = %body,
                "Record store insert failed"
            );
            return Err(format!("record store returned status {}: {}", status, body));
        }

        Ok(records.len())
    }
}
