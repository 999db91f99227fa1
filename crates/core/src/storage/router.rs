//! Request-to-backend routing.

use std::sync::Arc;

use tokio::io::AsyncRead;
use tracing::info;

use super::backend::{DownloadReference, StorageBackend};
use super::config::{BackendKind, StorageTarget, TransferSettings};
use super::error::StorageError;
use super::ftp::FtpBackend;
use super::key::ObjectKey;
use super::object_store::ObjectStoreBackend;

/// Backend and key a request resolved to.
pub struct Route {
    /// Selected adapter.
    pub backend: Arc<dyn StorageBackend>,
    /// Resolved location inside the adapter's container.
    pub key: ObjectKey,
}

/// Picks the backend for each request and resolves keys inside it.
///
/// Holds at most one adapter per [`BackendKind`]. When a request names no
/// backend, the operation's default is used if configured, otherwise the
/// only configured one.
#[derive(Clone)]
pub struct StorageRouter {
    object_store: Option<Arc<dyn StorageBackend>>,
    ftp: Option<Arc<dyn StorageBackend>>,
    download_ttl: std::time::Duration,
}

impl StorageRouter {
    /// Default backend for uploads.
    pub const UPLOAD_DEFAULT: BackendKind = BackendKind::Ftp;
    /// Default backend for list, download and delete.
    pub const READ_DEFAULT: BackendKind = BackendKind::ObjectStore;

    /// Create a router with no backends.
    #[must_use]
    pub fn new(settings: &TransferSettings) -> Self {
        Self {
            object_store: None,
            ftp: None,
            download_ttl: settings.download_ttl,
        }
    }

    /// Build adapters for every target.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationInvalid` if a target is malformed or two targets
    /// share a backend kind.
    pub fn from_targets(
        targets: &[StorageTarget],
        settings: TransferSettings,
    ) -> Result<Self, StorageError> {
        let mut router = Self::new(&settings);

        for target in targets {
            if router.slot(target.kind()).is_some() {
                return Err(StorageError::configuration(format!(
                    "{} backend configured twice",
                    target.kind()
                )));
            }

            let backend: Arc<dyn StorageBackend> = match target.kind() {
                BackendKind::ObjectStore => {
                    Arc::new(ObjectStoreBackend::from_target(target, settings)?)
                }
                BackendKind::Ftp => Arc::new(FtpBackend::from_target(target, settings)?),
            };
            info!(
                backend = %target.kind(),
                container = %target.container(),
                "Storage backend ready"
            );
            router = router.with_backend(backend);
        }

        Ok(router)
    }

    /// Register `backend`, replacing any adapter of the same kind.
    #[must_use]
    pub fn with_backend(mut self, backend: Arc<dyn StorageBackend>) -> Self {
        match backend.kind() {
            BackendKind::ObjectStore => self.object_store = Some(backend),
            BackendKind::Ftp => self.ftp = Some(backend),
        }
        self
    }

    fn slot(&self, kind: BackendKind) -> Option<&Arc<dyn StorageBackend>> {
        match kind {
            BackendKind::ObjectStore => self.object_store.as_ref(),
            BackendKind::Ftp => self.ftp.as_ref(),
        }
    }

    /// Configured backend kinds.
    #[must_use]
    pub fn configured(&self) -> Vec<BackendKind> {
        [BackendKind::ObjectStore, BackendKind::Ftp]
            .into_iter()
            .filter(|kind| self.slot(*kind).is_some())
            .collect()
    }

    /// Adapter for `selector`, or for `default` when the request named none.
    ///
    /// # Errors
    ///
    /// Returns `BackendNotConfigured` if an explicit selector names a missing
    /// backend or no backend is configured at all.
    pub fn backend(
        &self,
        selector: Option<BackendKind>,
        default: BackendKind,
    ) -> Result<Arc<dyn StorageBackend>, StorageError> {
        let kind = match selector {
            Some(kind) => kind,
            None if self.slot(default).is_some() => default,
            None => self.configured().first().copied().unwrap_or(default),
        };

        self.slot(kind)
            .cloned()
            .ok_or(StorageError::BackendNotConfigured { backend: kind })
    }

    /// Resolve the backend and the key `filename` maps to inside it.
    ///
    /// # Errors
    ///
    /// See [`Self::backend`] and [`ObjectKey::resolve`].
    pub fn route(
        &self,
        selector: Option<BackendKind>,
        default: BackendKind,
        filename: &str,
    ) -> Result<Route, StorageError> {
        let backend = self.backend(selector, default)?;
        let key = ObjectKey::resolve(backend.container(), filename)?;
        Ok(Route { backend, key })
    }

    /// Stream `content` into `filename`, returning the bytes stored.
    ///
    /// # Errors
    ///
    /// Routing errors, or whatever the adapter reports.
    pub async fn upload(
        &self,
        selector: Option<BackendKind>,
        filename: &str,
        content: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<u64, StorageError> {
        let route = self.route(selector, Self::UPLOAD_DEFAULT, filename)?;
        route.backend.put(&route.key, content).await
    }

    /// Names of all stored files.
    ///
    /// # Errors
    ///
    /// Routing errors, or whatever the adapter reports.
    pub async fn list(&self, selector: Option<BackendKind>) -> Result<Vec<String>, StorageError> {
        self.backend(selector, Self::READ_DEFAULT)?.list().await
    }

    /// Presigned download URL for `filename`, valid for the configured TTL.
    ///
    /// # Errors
    ///
    /// Routing errors, or whatever the adapter reports.
    pub async fn download_reference(
        &self,
        selector: Option<BackendKind>,
        filename: &str,
    ) -> Result<DownloadReference, StorageError> {
        let route = self.route(selector, Self::READ_DEFAULT, filename)?;
        route.backend.reference(&route.key, self.download_ttl).await
    }

    /// Delete `filename`.
    ///
    /// # Errors
    ///
    /// Routing errors, or whatever the adapter reports.
    pub async fn delete(
        &self,
        selector: Option<BackendKind>,
        filename: &str,
    ) -> Result<(), StorageError> {
        let route = self.route(selector, Self::READ_DEFAULT, filename)?;
        route.backend.delete(&route.key).await
    }
}

#[cfg(test)]
mod tests {
    use opendal::{Operator, services};

    use super::*;

    fn memory_operator() -> Operator {
        Operator::new(services::Memory::default())
            .expect("memory operator")
            .finish()
    }

    fn s3_only() -> StorageRouter {
        let backend = ObjectStoreBackend::from_operator(
            memory_operator(),
            "files",
            TransferSettings::default(),
        );
        StorageRouter::new(&TransferSettings::default()).with_backend(Arc::new(backend))
    }

    fn both() -> StorageRouter {
        s3_only().with_backend(Arc::new(FtpBackend::from_operator(
            memory_operator(),
            "/uploads",
            TransferSettings::default(),
        )))
    }

    #[test]
    fn test_explicit_selector_wins() {
        let router = both();
        let route = router
            .route(Some(BackendKind::ObjectStore), StorageRouter::UPLOAD_DEFAULT, "report.pdf")
            .expect("route");
        assert_eq!(route.backend.kind(), BackendKind::ObjectStore);
        assert_eq!(route.key.location(), "files/report.pdf");
    }

    #[test]
    fn test_upload_defaults_to_ftp() {
        let router = both();
        let route = router
            .route(None, StorageRouter::UPLOAD_DEFAULT, "report.pdf")
            .expect("route");
        assert_eq!(route.backend.kind(), BackendKind::Ftp);
        assert_eq!(route.key.location(), "uploads/report.pdf");
    }

    #[test]
    fn test_default_falls_back_to_only_configured_backend() {
        let router = s3_only();
        let backend = router
            .backend(None, StorageRouter::UPLOAD_DEFAULT)
            .expect("fallback");
        assert_eq!(backend.kind(), BackendKind::ObjectStore);
    }

    #[test]
    fn test_explicit_missing_backend_is_an_error() {
        let router = s3_only();
        let err = router
            .backend(Some(BackendKind::Ftp), StorageRouter::READ_DEFAULT)
            .err()
            .expect("not configured");
        assert!(matches!(
            err,
            StorageError::BackendNotConfigured {
                backend: BackendKind::Ftp
            }
        ));
    }

    #[test]
    fn test_empty_router_reports_not_configured() {
        let router = StorageRouter::new(&TransferSettings::default());
        assert!(router.configured().is_empty());
        assert!(router.backend(None, StorageRouter::READ_DEFAULT).is_err());
    }

    #[test]
    fn test_from_targets_rejects_duplicates() {
        let target = StorageTarget::ftp("localhost", 21, "u", "p", "/uploads");
        let err =
            StorageRouter::from_targets(&[target.clone(), target], TransferSettings::default())
                .err()
                .expect("duplicate");
        assert!(err.to_string().contains("configured twice"));
    }

    #[test]
    fn test_from_targets_builds_each_backend() {
        let targets = [
            StorageTarget::s3("http://127.0.0.1:9000", "files", "us-east-1", "a", "b"),
            StorageTarget::ftp("127.0.0.1", 21, "u", "p", "/uploads"),
        ];
        let router =
            StorageRouter::from_targets(&targets, TransferSettings::default()).expect("router");
        assert_eq!(
            router.configured(),
            vec![BackendKind::ObjectStore, BackendKind::Ftp]
        );
    }

    #[tokio::test]
    async fn test_upload_list_delete_round_trip() {
        let router = s3_only();
        let mut body: &[u8] = b"hello";

        let written = router
            .upload(Some(BackendKind::ObjectStore), "greeting.txt", &mut body)
            .await
            .expect("upload");
        assert_eq!(written, 5);
        assert_eq!(
            router.list(None).await.expect("list"),
            vec!["greeting.txt".to_string()]
        );

        router.delete(None, "greeting.txt").await.expect("delete");
        assert!(router.list(None).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_upload_rejects_empty_filename() {
        let router = s3_only();
        let mut body: &[u8] = b"x";
        let err = router.upload(None, "/", &mut body).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }
}
