//! Core storage logic for Filegate.
//!
//! This crate contains the storage abstraction with ZERO web dependencies.
//! Backends, key resolution and the streaming upload path live here.
//!
//! # Modules
//!
//! - `storage` - Backend adapters (S3, FTP), request routing and upload streaming

pub mod storage;
