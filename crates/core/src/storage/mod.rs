//! Storage backends for uploaded files using Apache OpenDAL.
//!
//! Two interchangeable adapters implement [`StorageBackend`]:
//! - S3-compatible object stores (AWS S3, MinIO, Cloudflare R2)
//! - FTP servers
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         StorageRouter                            │
//! │      selector ──► adapter          filename ──► ObjectKey        │
//! ├──────────────────────────────┬───────────────────────────────────┤
//! │    ObjectStoreBackend        │          FtpBackend               │
//! │  put / list / presign / del  │  mkdir -p + put / list / del      │
//! ├──────────────────────────────┴───────────────────────────────────┤
//! │        ChunkCursor ──► pipe ──► OpenDAL Writer (1 MiB steps)      │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

mod backend;
mod config;
mod error;
mod ftp;
mod key;
mod object_store;
mod router;
mod upload;

pub use backend::{DownloadReference, StorageBackend};
pub use config::{BackendKind, StorageTarget, TransferSettings};
pub use error::StorageError;
pub use ftp::FtpBackend;
pub use key::ObjectKey;
pub use object_store::ObjectStoreBackend;
pub use router::{Route, StorageRouter};
pub use upload::{ChunkCursor, ChunkSink, pipe};
