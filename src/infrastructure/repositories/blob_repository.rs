use async_trait::async_trait;

/// Repository for the durable blob store holding generated audio.
///
/// Implementations must honor upsert semantics: putting the same path twice
/// overwrites, so pipeline reruns never accumulate duplicate objects.
#[async_trait]
pub trait BlobRepository: Send + Sync {
    /// Store one object and return its stable public reference.
    async fn put(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
        upsert: bool,
    ) -> Result<String, String>;

    /// Public reference an object at `path` would have once stored.
    fn public_ref(&self, path: &str) -> String;
}

/// HTTP implementation of the blob-store collaborator
pub struct HttpBlobRepository {
    client: reqwest::Client,
    base_url: String,
    bucket: String,
    api_key: String,
}

impl HttpBlobRepository {
    pub fn new(client: reqwest::Client, base_url: String, bucket: String, api_key: String) -> Self {
        Self {
            client,
            base_url,
            bucket,
            api_key,
        }
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path)
    }
}

#[async_trait]
impl BlobRepository for HttpBlobRepository {
    async fn put(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
        upsert: bool,
    ) -> Result<String, String> {
        tracing::debug!(
            path = %path,
            size_bytes = bytes.len(),
            upsert = upsert,
            "Uploading object to blob store"
        );

        let response = self
            .client
            .post(self.object_url(path))
            .bearer_auth(&self.api_key)
            .header("content-type", content_type)
            .header("x-upsert", if upsert { "true" } else { "false" })
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| format!("blob store request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = status.as_u16(),
                path = %path,
                body = %body,
                "Blob store upload failed"
            );
            return Err(format!("blob store returned status {}: {}", status, body));
        }

        Ok(self.public_ref(path))
    }

    fn public_ref(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, path
        )
    }
}
