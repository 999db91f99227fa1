//! Application configuration management.

use serde::Deserialize;

use crate::error::{AppError, AppResult};

/// Application configuration.
///
/// Loaded once at startup and never mutated afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// S3-compatible object store (optional).
    #[serde(default)]
    pub s3: Option<S3Config>,
    /// FTP server (optional).
    #[serde(default)]
    pub ftp: Option<FtpConfig>,
    /// Transfer tuning.
    #[serde(default)]
    pub transfer: TransferConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upper bound on request bodies. Unset disables the limit.
    #[serde(default)]
    pub max_upload_bytes: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// S3-compatible object store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    /// Bucket holding uploaded files.
    pub bucket: String,
    /// Bucket region.
    pub region: String,
    /// Endpoint URL, e.g. `https://s3.eu-central-1.amazonaws.com`.
    pub endpoint: String,
    /// Access key ID.
    pub access_key: String,
    /// Secret access key.
    pub secret_key: String,
    /// Address the bucket as `{bucket}.{endpoint}` instead of `{endpoint}/{bucket}`.
    #[serde(default = "default_virtual_host_style")]
    pub virtual_host_style: bool,
}

fn default_virtual_host_style() -> bool {
    true
}

/// FTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FtpConfig {
    /// Server host name or address.
    pub host: String,
    /// Control connection port.
    #[serde(default = "default_ftp_port")]
    pub port: u16,
    /// Login user.
    pub user: String,
    /// Login password.
    pub password: String,
    /// Directory that holds uploaded files.
    #[serde(default = "default_base_directory")]
    pub base_directory: String,
}

fn default_ftp_port() -> u16 {
    21
}

fn default_base_directory() -> String {
    "/uploads".to_string()
}

/// Transfer tuning shared by all backends.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferConfig {
    /// Size of each chunk forwarded to a backend during uploads.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Validity window of download URLs.
    #[serde(default = "default_download_ttl")]
    pub download_ttl_secs: u64,
    /// Upper bound on a single upload.
    #[serde(default = "default_transfer_timeout")]
    pub transfer_timeout_secs: u64,
    /// Upper bound on list, delete and presign calls.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            download_ttl_secs: default_download_ttl(),
            transfer_timeout_secs: default_transfer_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_chunk_size() -> usize {
    1024 * 1024 // 1 MiB
}

fn default_download_ttl() -> u64 {
    3600 // 1 hour
}

fn default_transfer_timeout() -> u64 {
    3600 // 1 hour
}

fn default_request_timeout() -> u64 {
    30
}

/// `FILEGATE__SECTION__KEY` variables, e.g. `FILEGATE__S3__BUCKET`.
fn environment() -> config::Environment {
    config::Environment::with_prefix("FILEGATE").separator("__")
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_with(environment())
    }

    fn load_with(env: config::Environment) -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(env)
            .build()?;

        config.try_deserialize()
    }

    /// Checks values that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Configuration` when no backend is configured or a
    /// transfer setting is zero.
    pub fn validate(&self) -> AppResult<()> {
        if self.s3.is_none() && self.ftp.is_none() {
            return Err(AppError::Configuration(
                "at least one of [s3] or [ftp] must be configured".to_string(),
            ));
        }

        let transfer = &self.transfer;
        if transfer.chunk_size == 0 {
            return Err(AppError::Configuration(
                "transfer.chunk_size must be greater than zero".to_string(),
            ));
        }
        if transfer.download_ttl_secs == 0
            || transfer.transfer_timeout_secs == 0
            || transfer.request_timeout_secs == 0
        {
            return Err(AppError::Configuration(
                "transfer TTL and timeouts must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
