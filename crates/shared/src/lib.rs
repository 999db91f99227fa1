//! Shared errors and configuration for Filegate.
//!
//! This crate provides common types used across all other crates:
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;

pub use config::{AppConfig, FtpConfig, S3Config, ServerConfig, TransferConfig};
pub use error::{AppError, AppResult};
