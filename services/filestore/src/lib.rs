//! File Store
//!
//! Uploads local files, clipboard files and remote URLs to one configurable
//! object storage backend and returns a fetchable URL per file.
//!
//! ## Features
//!
//! - **Pluggable Backends**: S3-compatible storage, Aliyun OSS, Tencent COS,
//!   Qiniu Kodo and GitHub repositories behind one `Backend` trait
//! - **Graceful Degradation**: a missing or broken backend configuration
//!   installs an empty backend whose uploads fail with the reason, instead of
//!   aborting startup
//! - **Key Templates**: object keys built from `{filename}`, `{ext}`,
//!   `{timestamp}`, `{uuid}` and `{rand}` placeholders
//! - **Clipboard Resolution**: file references or path-like text from the
//!   desktop clipboard, bounded by a timeout
//!
//! ## Architecture
//!
//! ```text
//!  paths        clipboard         urls
//!    │              │               │
//!    │       ┌──────────────┐ ┌──────────────┐
//!    │       │ Clipboard    │ │ Downloader   │
//!    │       │ Resolver     │ │ (temp files) │
//!    │       └──────────────┘ └──────────────┘
//!    ▼              ▼               │
//! ┌─────────────────────────┐       │
//! │ Path Validator          │       │
//! └─────────────────────────┘       │
//!              │                    │
//!              ▼                    ▼
//!       ┌─────────────────────────────────┐
//!       │ Storage Service (key templates) │
//!       └─────────────────────────────────┘
//!                       │
//!                       ▼
//!       ┌─────────────────────────────────┐
//!       │ Storage Router                  │
//!       └─────────────────────────────────┘
//!                       │
//!     ┌──────┬──────┬───┴──┬───────┬────────┐
//!     ▼      ▼      ▼      ▼       ▼        ▼
//!    S3     OSS    COS   Qiniu   GitHub   Empty
//! ```

pub mod backend;
pub mod clipboard;
pub mod config;
pub mod content_type;
pub mod download;
pub mod filestore;
pub mod key_format;
pub mod router;
pub mod service;
pub mod validator;

#[cfg(test)]
mod test_support;

pub use backend::{Backend, EmptyBackend, StorageError, UploadBody};
pub use clipboard::{ClipboardError, ClipboardResolver, SystemClipboard};
pub use config::{ConfigError, Settings, StorageConfig, StorageKind};
pub use download::{DownloadError, Downloader};
pub use filestore::{FileStore, FileStoreError, UploadReport, UploadSource};
pub use key_format::KeyFormatter;
pub use router::{select_backend, StorageRouter};
pub use service::StorageService;
pub use validator::{validate_paths, ValidationError};
