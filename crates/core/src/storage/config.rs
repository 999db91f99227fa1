//! Storage configuration types.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use filegate_shared::{FtpConfig, S3Config, TransferConfig};
use serde::{Deserialize, Serialize};

use super::error::StorageError;

/// Kind of storage backend a request can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// S3-compatible object store.
    #[serde(rename = "s3")]
    ObjectStore,
    /// FTP server.
    #[serde(rename = "ftp")]
    Ftp,
}

impl BackendKind {
    /// Selector name used in query strings.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ObjectStore => "s3",
            Self::Ftp => "ftp",
        }
    }

    /// Human-readable label for messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ObjectStore => "S3",
            Self::Ftp => "FTP",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "s3" => Ok(Self::ObjectStore),
            "ftp" => Ok(Self::Ftp),
            other => Err(StorageError::configuration(format!(
                "unknown storage type '{other}', expected 's3' or 'ftp'"
            ))),
        }
    }
}

/// One configured backend instance.
#[derive(Debug, Clone)]
pub enum StorageTarget {
    /// S3-compatible storage: AWS S3, MinIO, Cloudflare R2
    ObjectStore {
        /// S3 endpoint URL.
        endpoint: String,
        /// Bucket name.
        bucket: String,
        /// Bucket region.
        region: String,
        /// Access key ID.
        access_key_id: String,
        /// Secret access key.
        secret_access_key: String,
        /// Use virtual-hosted-style bucket addressing.
        virtual_host_style: bool,
    },
    /// FTP server
    Ftp {
        /// Server host.
        host: String,
        /// Control connection port.
        port: u16,
        /// Login user.
        user: String,
        /// Login password.
        password: String,
        /// Directory holding uploaded files.
        base_directory: String,
    },
}

impl StorageTarget {
    /// Create S3-compatible target with virtual-hosted-style addressing.
    #[must_use]
    pub fn s3(
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        region: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        Self::ObjectStore {
            endpoint: endpoint.into(),
            bucket: bucket.into(),
            region: region.into(),
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            virtual_host_style: true,
        }
    }

    /// Create FTP target.
    #[must_use]
    pub fn ftp(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
        base_directory: impl Into<String>,
    ) -> Self {
        Self::Ftp {
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
            base_directory: base_directory.into(),
        }
    }

    /// Backend kind of this target.
    #[must_use]
    pub const fn kind(&self) -> BackendKind {
        match self {
            Self::ObjectStore { .. } => BackendKind::ObjectStore,
            Self::Ftp { .. } => BackendKind::Ftp,
        }
    }

    /// Get the bucket name or base directory.
    #[must_use]
    pub fn container(&self) -> &str {
        match self {
            Self::ObjectStore { bucket, .. } => bucket,
            Self::Ftp { base_directory, .. } => base_directory,
        }
    }

    /// Reject targets with empty connection parameters.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ConfigurationInvalid` naming the first empty field.
    pub fn validate(&self) -> Result<(), StorageError> {
        let required: Vec<(&str, &str)> = match self {
            Self::ObjectStore {
                endpoint,
                bucket,
                region,
                access_key_id,
                secret_access_key,
                ..
            } => vec![
                ("s3.endpoint", endpoint.as_str()),
                ("s3.bucket", bucket.as_str()),
                ("s3.region", region.as_str()),
                ("s3.access_key", access_key_id.as_str()),
                ("s3.secret_key", secret_access_key.as_str()),
            ],
            Self::Ftp { host, user, .. } => {
                vec![("ftp.host", host.as_str()), ("ftp.user", user.as_str())]
            }
        };

        match required.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(StorageError::configuration(format!(
                "{field} must not be empty"
            ))),
            None => Ok(()),
        }
    }
}

impl From<&S3Config> for StorageTarget {
    fn from(config: &S3Config) -> Self {
        Self::ObjectStore {
            endpoint: config.endpoint.clone(),
            bucket: config.bucket.clone(),
            region: config.region.clone(),
            access_key_id: config.access_key.clone(),
            secret_access_key: config.secret_key.clone(),
            virtual_host_style: config.virtual_host_style,
        }
    }
}

impl From<&FtpConfig> for StorageTarget {
    fn from(config: &FtpConfig) -> Self {
        Self::ftp(
            config.host.clone(),
            config.port,
            config.user.clone(),
            config.password.clone(),
            config.base_directory.clone(),
        )
    }
}

/// Transfer tuning applied by every backend adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferSettings {
    /// Bytes read from the inbound stream per step.
    pub chunk_size: usize,
    /// Download URL validity window.
    pub download_ttl: Duration,
    /// Upper bound on one upload.
    pub transfer_timeout: Duration,
    /// Upper bound on list, delete and presign calls.
    pub request_timeout: Duration,
}

impl TransferSettings {
    /// Default chunk size: 1 MiB.
    pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;
    /// Default download TTL: 1 hour.
    pub const DEFAULT_DOWNLOAD_TTL: Duration = Duration::from_secs(3600);
    /// Default transfer timeout: 1 hour.
    pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(3600);
    /// Default timeout for short calls: 30 seconds.
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Set chunk size.
    #[must_use]
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Set download URL TTL.
    #[must_use]
    pub fn with_download_ttl(mut self, ttl: Duration) -> Self {
        self.download_ttl = ttl;
        self
    }

    /// Set upload timeout.
    #[must_use]
    pub fn with_transfer_timeout(mut self, timeout: Duration) -> Self {
        self.transfer_timeout = timeout;
        self
    }

    /// Set timeout for short calls.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
            download_ttl: Self::DEFAULT_DOWNLOAD_TTL,
            transfer_timeout: Self::DEFAULT_TRANSFER_TIMEOUT,
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl From<&TransferConfig> for TransferSettings {
    fn from(config: &TransferConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            download_ttl: Duration::from_secs(config.download_ttl_secs),
            transfer_timeout: Duration::from_secs(config.transfer_timeout_secs),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}
