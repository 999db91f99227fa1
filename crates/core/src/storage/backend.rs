//! Backend capability interface shared by every adapter.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::io::AsyncRead;
use tracing::warn;

use super::config::BackendKind;
use super::error::StorageError;
use super::key::ObjectKey;
use super::upload::ChunkSink;

/// Time-limited URL granting read access to one object.
#[derive(Debug, Clone)]
pub struct DownloadReference {
    /// The presigned URL.
    pub url: String,
    /// HTTP method to use (GET).
    pub method: String,
    /// When the URL expires.
    pub expires_at: DateTime<Utc>,
}

impl DownloadReference {
    /// Build a reference expiring `ttl` from now.
    #[must_use]
    pub fn expiring_in(url: impl Into<String>, method: impl Into<String>, ttl: Duration) -> Self {
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            url: url.into(),
            method: method.into(),
            expires_at,
        }
    }
}

/// Operations every storage backend offers.
///
/// Adapters are bound to one configured target at construction; all calls
/// address that target's container.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Which backend this is.
    fn kind(&self) -> BackendKind;

    /// Bucket name or base directory.
    fn container(&self) -> &str;

    /// Stream `content` into `key`, returning the bytes stored.
    async fn put(
        &self,
        key: &ObjectKey,
        content: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<u64, StorageError>;

    /// Names of all files in the container, relative to it.
    async fn list(&self) -> Result<Vec<String>, StorageError>;

    /// Presigned read URL for `key`, valid for `ttl`.
    async fn reference(
        &self,
        key: &ObjectKey,
        ttl: Duration,
    ) -> Result<DownloadReference, StorageError>;

    /// Remove `key`. Removing an absent key succeeds.
    async fn delete(&self, key: &ObjectKey) -> Result<(), StorageError>;
}

/// OpenDAL writer adapted to the upload pipe.
pub(crate) struct OperatorSink {
    writer: opendal::Writer,
    backend: BackendKind,
}

impl OperatorSink {
    pub(crate) fn new(writer: opendal::Writer, backend: BackendKind) -> Self {
        Self { writer, backend }
    }
}

#[async_trait]
impl ChunkSink for OperatorSink {
    async fn write_chunk(&mut self, chunk: Bytes) -> Result<(), StorageError> {
        self.writer
            .write(chunk)
            .await
            .map_err(|e| StorageError::from_backend(self.backend, &e))
    }

    async fn finish(&mut self) -> Result<(), StorageError> {
        self.writer
            .close()
            .await
            .map(|_| ())
            .map_err(|e| StorageError::from_backend(self.backend, &e))
    }

    async fn abort(&mut self) {
        if let Err(e) = self.writer.abort().await {
            warn!(backend = %self.backend, error = %e, "Failed to abort partial upload");
        }
    }
}

/// Run `fut`, failing with `BackendUnavailable` once `limit` elapses.
pub(crate) async fn with_deadline<T, F>(
    limit: Duration,
    operation: &'static str,
    fut: F,
) -> Result<T, StorageError>
where
    F: Future<Output = Result<T, StorageError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(StorageError::BackendUnavailable(format!(
            "{operation} timed out after {}s",
            limit.as_secs()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_reference_expiry() {
        let before = Utc::now();
        let reference =
            DownloadReference::expiring_in("https://example/x", "GET", Duration::from_secs(3600));
        let delta = reference.expires_at - before;

        // Tolerance for slow test machines.
        assert!(delta.num_seconds() >= 3595 && delta.num_seconds() <= 3605);
        assert_eq!(reference.method, "GET");
    }

    #[test]
    fn test_download_reference_saturates() {
        let reference = DownloadReference::expiring_in("u", "GET", Duration::MAX);
        assert_eq!(reference.expires_at, DateTime::<Utc>::MAX_UTC);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_deadline_times_out() {
        let result: Result<(), StorageError> =
            with_deadline(Duration::from_secs(30), "list", async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            })
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, StorageError::BackendUnavailable(_)));
        assert_eq!(
            err.to_string(),
            "storage backend unavailable: list timed out after 30s"
        );
    }

    #[tokio::test]
    async fn test_with_deadline_passes_result_through() {
        let result = with_deadline(Duration::from_secs(1), "delete", async {
            Err::<(), _>(StorageError::NotFound("x".to_string()))
        })
        .await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }
}
