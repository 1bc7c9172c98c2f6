use crate::infrastructure::repositories::BlobRepository;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("upload timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Clone)]
pub struct UploadedObject {
    pub public_ref: String,
    pub size_bytes: u64,
}

/// Seam between the batch executor and durable artifact persistence.
#[async_trait]
pub trait ArtifactUploader: Send + Sync {
    async fn upload(
        &self,
        payload: &[u8],
        folder_path: &str,
        file_name: &str,
    ) -> Result<UploadedObject, UploadError>;
}

/// Persists one artifact under a deterministic name with upsert semantics,
/// bounded by a timeout so one stuck upload cannot hold its concurrency slot
/// forever.
pub struct UploadService {
    blobs: Arc<dyn BlobRepository>,
    timeout: Duration,
}

impl UploadService {
    pub fn new(blobs: Arc<dyn BlobRepository>, timeout: Duration) -> Self {
        Self { blobs, timeout }
    }
}

#[async_trait]
impl ArtifactUploader for UploadService {
    async fn upload(
        &self,
        payload: &[u8],
        folder_path: &str,
        file_name: &str,
    ) -> Result<UploadedObject, UploadError> {
        let path = format!("{}/{}", folder_path, file_name);
        let size_bytes = payload.len() as u64;

        let put = self.blobs.put(&path, payload, "audio/mpeg", true);
        let public_ref = match tokio::time::timeout(self.timeout, put).await {
            Ok(Ok(public_ref)) => public_ref,
            Ok(Err(error)) => return Err(UploadError::Storage(error)),
            Err(_) => {
                tracing::error!(
                    path = %path,
                    timeout_secs = self.timeout.as_secs(),
                    "Upload timed out"
                );
                return Err(UploadError::Timeout(self.timeout));
            }
        };

        tracing::debug!(
            path = %path,
            size_bytes = size_bytes,
            "Artifact uploaded"
        );

        Ok(UploadedObject {
            public_ref,
            size_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory blob store with upsert semantics
    struct MemoryBlobRepository {
        objects: Mutex<HashMap<String, Vec<u8>>>,
        delay: Duration,
    }

    #[async_trait]
    impl BlobRepository for MemoryBlobRepository {
        async fn put(
            &self,
            path: &str,
            bytes: &[u8],
            _content_type: &str,
            upsert: bool,
        ) -> Result<String, String> {
            tokio::time::sleep(self.delay).await;
            let mut objects = self.objects.lock().unwrap();
            if !upsert && objects.contains_key(path) {
                return Err(format!("object already exists: {}", path));
            }
            objects.insert(path.to_string(), bytes.to_vec());
            Ok(self.public_ref(path))
        }

        fn public_ref(&self, path: &str) -> String {
            format!("mem://bucket/{}", path)
        }
    }

    #[tokio::test]
    async fn test_upload_returns_public_ref_and_size() {
        let blobs = Arc::new(MemoryBlobRepository {
            objects: Mutex::new(HashMap::new()),
            delay: Duration::ZERO,
        });
        let service = UploadService::new(blobs, Duration::from_secs(60));

        let uploaded = service.upload(&[1, 2, 3], "gyeongbokgung", "1-1ko.mp3").await.unwrap();

        assert_eq!(uploaded.public_ref, "mem://bucket/gyeongbokgung/1-1ko.mp3");
        assert_eq!(uploaded.size_bytes, 3);
    }

    #[tokio::test]
    async fn test_second_upload_to_same_path_overwrites() {
        let blobs = Arc::new(MemoryBlobRepository {
            objects: Mutex::new(HashMap::new()),
            delay: Duration::ZERO,
        });
        let service = UploadService::new(blobs.clone(), Duration::from_secs(60));

        service.upload(&[1, 1, 1], "palace", "1-1ko.mp3").await.unwrap();
        service.upload(&[2, 2], "palace", "1-1ko.mp3").await.unwrap();

        let objects = blobs.objects.lock().unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects["palace/1-1ko.mp3"], vec![2, 2]);
    }

    #[tokio::test]
    async fn test_slow_upload_times_out() {
        let blobs = Arc::new(MemoryBlobRepository {
            objects: Mutex::new(HashMap::new()),
            delay: Duration::from_millis(200),
        });
        let service = UploadService::new(blobs, Duration::from_millis(20));

        let result = service.upload(&[1], "palace", "1-1ko.mp3").await;

        assert!(matches!(result, Err(UploadError::Timeout(_))));
    }
}
