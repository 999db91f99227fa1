//! S3-compatible object store adapter.

use std::time::Duration;

use async_trait::async_trait;
use opendal::{ErrorKind, Operator, services};
use tokio::io::AsyncRead;
use tracing::{error, info};

use super::backend::{DownloadReference, OperatorSink, StorageBackend, with_deadline};
use super::config::{BackendKind, StorageTarget, TransferSettings};
use super::error::StorageError;
use super::key::ObjectKey;
use super::upload::{ChunkCursor, pipe};

/// Smallest multipart part S3 accepts (except the last one).
const S3_MIN_PART_SIZE: usize = 5 * 1024 * 1024;

/// Adapter for one S3 bucket.
pub struct ObjectStoreBackend {
    operator: Operator,
    bucket: String,
    settings: TransferSettings,
}

impl ObjectStoreBackend {
    /// Connect to the bucket described by `target`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationInvalid` if `target` is not an S3 target or the
    /// driver rejects its parameters.
    pub fn from_target(
        target: &StorageTarget,
        settings: TransferSettings,
    ) -> Result<Self, StorageError> {
        target.validate()?;

        let StorageTarget::ObjectStore {
            endpoint,
            bucket,
            region,
            access_key_id,
            secret_access_key,
            virtual_host_style,
        } = target
        else {
            return Err(StorageError::configuration(format!(
                "expected an s3 target, got {}",
                target.kind()
            )));
        };

        let mut builder = services::S3::default()
            .root("/")
            .endpoint(endpoint)
            .bucket(bucket)
            .region(region)
            .access_key_id(access_key_id)
            .secret_access_key(secret_access_key);
        if *virtual_host_style {
            builder = builder.enable_virtual_host_style();
        }

        let operator = Operator::new(builder)
            .map_err(|e| StorageError::configuration(e.to_string()))?
            .finish();

        Ok(Self::from_operator(operator, bucket.clone(), settings))
    }

    /// Wrap an already built operator addressing `bucket`.
    #[must_use]
    pub fn from_operator(
        operator: Operator,
        bucket: impl Into<String>,
        settings: TransferSettings,
    ) -> Self {
        Self {
            operator,
            bucket: bucket.into(),
            settings,
        }
    }

    fn classify(err: &opendal::Error) -> StorageError {
        StorageError::from_backend(BackendKind::ObjectStore, err)
    }
}

#[async_trait]
impl StorageBackend for ObjectStoreBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::ObjectStore
    }

    fn container(&self) -> &str {
        &self.bucket
    }

    async fn put(
        &self,
        key: &ObjectKey,
        content: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<u64, StorageError> {
        let part_size = self.settings.chunk_size.max(S3_MIN_PART_SIZE);

        let result = with_deadline(self.settings.transfer_timeout, "upload", async {
            let writer = self
                .operator
                .writer_with(key.name())
                .chunk(part_size)
                .await
                .map_err(|e| Self::classify(&e))?;
            let mut sink = OperatorSink::new(writer, BackendKind::ObjectStore);
            let mut cursor = ChunkCursor::new(content, self.settings.chunk_size);
            pipe(&mut cursor, &mut sink).await
        })
        .await;

        match &result {
            Ok(bytes) => info!(bucket = %self.bucket, key = %key.name(), bytes, "Object stored"),
            Err(e) => error!(
                bucket = %self.bucket,
                key = %key.name(),
                error = %e,
                "Object upload failed"
            ),
        }
        result
    }

    async fn list(&self) -> Result<Vec<String>, StorageError> {
        with_deadline(self.settings.request_timeout, "list", async {
            let entries = self
                .operator
                .list_with("/")
                .recursive(true)
                .await
                .map_err(|e| Self::classify(&e))?;

            Ok(entries
                .into_iter()
                .map(|entry| entry.path().to_string())
                .filter(|path| !path.ends_with('/'))
                .collect())
        })
        .await
    }

    async fn reference(
        &self,
        key: &ObjectKey,
        ttl: Duration,
    ) -> Result<DownloadReference, StorageError> {
        // No existence check: a URL for an absent key is issued and 404s when fetched.
        with_deadline(self.settings.request_timeout, "presign", async {
            let presigned = self
                .operator
                .presign_read(key.name(), ttl)
                .await
                .map_err(|e| Self::classify(&e))?;

            Ok(DownloadReference::expiring_in(
                presigned.uri().to_string(),
                presigned.method().to_string(),
                ttl,
            ))
        })
        .await
    }

    async fn delete(&self, key: &ObjectKey) -> Result<(), StorageError> {
        with_deadline(self.settings.request_timeout, "delete", async {
            match self.operator.delete(key.name()).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(Self::classify(&e)),
            }
        })
        .await
    }
}
