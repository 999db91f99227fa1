//! FTP adapter.
//!
//! Files live under a base directory on the server. The directory is created
//! on first upload if the server does not have it yet.

use std::time::Duration;

use async_trait::async_trait;
use opendal::{ErrorKind, Operator, services};
use tokio::io::AsyncRead;
use tracing::{debug, error, info};

use super::backend::{DownloadReference, OperatorSink, StorageBackend, with_deadline};
use super::config::{BackendKind, StorageTarget, TransferSettings};
use super::error::StorageError;
use super::key::{ObjectKey, collapse_separators};
use super::upload::{ChunkCursor, pipe};

/// Adapter for one directory on an FTP server.
pub struct FtpBackend {
    operator: Operator,
    base_directory: String,
    settings: TransferSettings,
}

impl FtpBackend {
    /// Connect to the server described by `target`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationInvalid` if `target` is not an FTP target or the
    /// driver rejects its parameters.
    pub fn from_target(
        target: &StorageTarget,
        settings: TransferSettings,
    ) -> Result<Self, StorageError> {
        target.validate()?;

        let StorageTarget::Ftp {
            host,
            port,
            user,
            password,
            base_directory,
        } = target
        else {
            return Err(StorageError::configuration(format!(
                "expected an ftp target, got {}",
                target.kind()
            )));
        };

        let builder = services::Ftp::default()
            .endpoint(&format!("ftp://{host}:{port}"))
            .root("/")
            .user(user)
            .password(password);

        let operator = Operator::new(builder)
            .map_err(|e| StorageError::configuration(e.to_string()))?
            .finish();

        Ok(Self::from_operator(operator, base_directory, settings))
    }

    /// Wrap an already built operator, storing files under `base_directory`.
    #[must_use]
    pub fn from_operator(
        operator: Operator,
        base_directory: impl Into<String>,
        settings: TransferSettings,
    ) -> Self {
        Self {
            operator,
            base_directory: base_directory.into(),
            settings,
        }
    }

    fn classify(err: &opendal::Error) -> StorageError {
        StorageError::from_backend(BackendKind::Ftp, err)
    }

    /// Base directory as an operator path: `dir/`, or `/` for the root.
    fn directory_path(&self) -> String {
        let base = collapse_separators(&self.base_directory);
        if base.is_empty() {
            "/".to_string()
        } else {
            format!("{base}/")
        }
    }

    /// Make sure `dir` exists before writing into it.
    async fn ensure_directory(&self, dir: &str) -> Result<(), StorageError> {
        let present = self
            .operator
            .exists(dir)
            .await
            .map_err(|e| Self::classify(&e))?;
        if present {
            return Ok(());
        }

        Self::accept_created(dir, self.operator.create_dir(dir).await)
    }

    /// Only `AlreadyExists` is tolerated from `create_dir`.
    ///
    /// The OpenDAL FTP driver already swallows `550` replies to `MKD` and
    /// creates parent directories on write, so against a real FTP server
    /// this arm is only reached through other drivers.
    fn accept_created(dir: &str, outcome: opendal::Result<()>) -> Result<(), StorageError> {
        match outcome {
            Ok(()) => {
                debug!(directory = %dir, "Created FTP directory");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(Self::classify(&e)),
        }
    }
}

#[async_trait]
impl StorageBackend for FtpBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Ftp
    }

    fn container(&self) -> &str {
        &self.base_directory
    }

    async fn put(
        &self,
        key: &ObjectKey,
        content: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<u64, StorageError> {
        let path = key.location();

        let result = with_deadline(self.settings.transfer_timeout, "upload", async {
            if let Some(dir) = key.parent_directory() {
                self.ensure_directory(&dir).await?;
            }

            let writer = self
                .operator
                .writer(&path)
                .await
                .map_err(|e| Self::classify(&e))?;
            let mut sink = OperatorSink::new(writer, BackendKind::Ftp);
            let mut cursor = ChunkCursor::new(content, self.settings.chunk_size);
            pipe(&mut cursor, &mut sink).await
        })
        .await;

        match &result {
            Ok(bytes) => info!(path = %path, bytes, "File stored on FTP"),
            Err(e) => error!(path = %path, error = %e, "FTP upload failed"),
        }
        result
    }

    async fn list(&self) -> Result<Vec<String>, StorageError> {
        let dir = self.directory_path();
        let prefix = if dir == "/" { String::new() } else { dir.clone() };

        with_deadline(self.settings.request_timeout, "list", async {
            let entries = match self.operator.list_with(&dir).recursive(true).await {
                Ok(entries) => entries,
                // A base directory nobody has uploaded into yet is empty.
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => return Err(Self::classify(&e)),
            };

            Ok(entries
                .into_iter()
                .map(|entry| entry.path().to_string())
                .filter(|path| !path.ends_with('/'))
                .map(|path| match path.strip_prefix(&prefix) {
                    Some(name) => name.to_string(),
                    None => path,
                })
                .collect())
        })
        .await
    }

    async fn reference(
        &self,
        key: &ObjectKey,
        _ttl: Duration,
    ) -> Result<DownloadReference, StorageError> {
        Err(StorageError::unsupported(format!(
            "FTP has no download URLs (requested '{}')",
            key.name()
        )))
    }

    async fn delete(&self, key: &ObjectKey) -> Result<(), StorageError> {
        let path = key.location();

        with_deadline(self.settings.request_timeout, "delete", async {
            match self.operator.delete(&path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(Self::classify(&e)),
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use tempfile::TempDir;

    use super::*;

    /// Local directory standing in for the FTP server's file tree.
    fn fs_backend(base_directory: &str) -> (TempDir, FtpBackend) {
        let root = tempfile::tempdir().expect("tempdir");
        let operator = Operator::new(
            services::Fs::default().root(root.path().to_str().expect("utf-8 path")),
        )
        .expect("fs operator")
        .finish();
        let backend = FtpBackend::from_operator(
            operator,
            base_directory,
            TransferSettings::default().with_chunk_size(8),
        );
        (root, backend)
    }

    async fn upload(backend: &FtpBackend, filename: &str, data: &[u8]) -> u64 {
        let key = ObjectKey::resolve(backend.container(), filename).expect("key");
        let mut reader = data;
        backend.put(&key, &mut reader).await.expect("put")
    }

    #[tokio::test]
    async fn test_upload_stores_file_under_base_directory() {
        let (root, backend) = fs_backend("/uploads");
        assert!(!root.path().join("uploads").exists());

        let written = upload(&backend, "report.pdf", b"%PDF-1.7 numbers").await;

        assert_eq!(written, 16);
        let stored = std::fs::read(root.path().join("uploads/report.pdf")).expect("stored file");
        assert_eq!(stored, b"%PDF-1.7 numbers");
    }

    #[tokio::test]
    async fn test_ensure_directory_creates_then_accepts_existing() {
        let (root, backend) = fs_backend("/uploads");
        let dir = backend.directory_path();

        backend.ensure_directory(&dir).await.expect("create");
        assert!(root.path().join("uploads").is_dir());

        backend.ensure_directory(&dir).await.expect("already present");
        assert!(root.path().join("uploads").is_dir());
    }

    #[tokio::test]
    async fn test_ensure_directory_creates_nested_path() {
        let (root, backend) = fs_backend("/uploads");

        backend
            .ensure_directory("uploads/2024/q1/")
            .await
            .expect("create");

        assert!(root.path().join("uploads/2024/q1").is_dir());
    }

    #[test]
    fn test_create_dir_already_exists_is_tolerated() {
        let outcome = Err(opendal::Error::new(ErrorKind::AlreadyExists, "exists"));
        assert!(FtpBackend::accept_created("uploads/", outcome).is_ok());
    }

    #[rstest]
    #[case(ErrorKind::PermissionDenied)]
    #[case(ErrorKind::NotFound)]
    #[case(ErrorKind::Unexpected)]
    fn test_create_dir_other_failures_propagate(#[case] kind: ErrorKind) {
        let outcome = Err(opendal::Error::new(kind, "mkdir refused"));
        let err = FtpBackend::accept_created("uploads/", outcome)
            .err()
            .expect("should propagate");
        assert!(err.to_string().contains("mkdir refused"));
    }

    #[tokio::test]
    async fn test_upload_into_existing_directory() {
        let (root, backend) = fs_backend("uploads");
        std::fs::create_dir_all(root.path().join("uploads")).expect("mkdir");

        upload(&backend, "a.txt", b"a").await;

        assert!(root.path().join("uploads/a.txt").exists());
    }

    #[tokio::test]
    async fn test_list_strips_base_directory() {
        let (_root, backend) = fs_backend("/uploads");
        upload(&backend, "a.txt", b"a").await;
        upload(&backend, "b.txt", b"bb").await;

        let mut files = backend.list().await.expect("list");
        files.sort();

        assert_eq!(files, vec!["a.txt".to_string(), "b.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_list_missing_directory_is_empty() {
        let (_root, backend) = fs_backend("/never-created");
        assert!(backend.list().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_zero_length_upload() {
        let (root, backend) = fs_backend("/uploads");

        assert_eq!(upload(&backend, "empty.bin", b"").await, 0);

        let meta = std::fs::metadata(root.path().join("uploads/empty.bin")).expect("metadata");
        assert_eq!(meta.len(), 0);
    }

    #[tokio::test]
    async fn test_delete_then_list_omits_file() {
        let (_root, backend) = fs_backend("/uploads");
        upload(&backend, "report.pdf", b"data").await;
        let key = ObjectKey::resolve("/uploads", "report.pdf").expect("key");

        backend.delete(&key).await.expect("delete");

        assert!(backend.list().await.expect("list").is_empty());
        backend.delete(&key).await.expect("absent delete");
    }

    #[tokio::test]
    async fn test_reference_is_unsupported() {
        let (_root, backend) = fs_backend("/uploads");
        let key = ObjectKey::resolve("/uploads", "report.pdf").expect("key");

        let err = backend
            .reference(&key, Duration::from_secs(3600))
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Unsupported(_)));
    }

    #[test]
    fn test_from_target_rejects_s3_target() {
        let target = StorageTarget::s3("http://localhost:9000", "files", "us-east-1", "a", "b");
        let err = FtpBackend::from_target(&target, TransferSettings::default())
            .err()
            .expect("should reject");
        assert!(matches!(err, StorageError::ConfigurationInvalid(_)));
    }

    #[test]
    fn test_from_target_builds_operator() {
        let target = StorageTarget::ftp("127.0.0.1", 2121, "user", "pass", "/uploads");
        let backend =
            FtpBackend::from_target(&target, TransferSettings::default()).expect("backend");
        assert_eq!(backend.kind(), BackendKind::Ftp);
        assert_eq!(backend.container(), "/uploads");
        assert_eq!(backend.directory_path(), "uploads/");
    }
}
