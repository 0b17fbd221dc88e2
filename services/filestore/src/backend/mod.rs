//! Storage backends.
//!
//! Every backend implements [`Backend`]: upload a local file or a byte stream
//! under a given object key and return a URL the caller can fetch.

pub mod cos;
pub mod empty;
pub mod github;
pub mod oss;
pub mod qiniu;
pub mod s3;

pub use cos::CosBackend;
pub use empty::EmptyBackend;
pub use github::GitHubBackend;
pub use oss::OssBackend;
pub use qiniu::QiniuBackend;
pub use s3::S3Backend;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use uuid::Uuid;

/// Byte stream accepted by [`Backend::upload`]
pub type UploadBody = Box<dyn AsyncRead + Send + Unpin>;

/// Errors returned by backend calls
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage service not configured or initialization failed. {0}")]
    NotConfigured(String),

    #[error("failed to open file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read upload body: {0}")]
    Read(#[source] std::io::Error),

    #[error("failed to upload file to {provider}: {message}")]
    Upload {
        provider: &'static str,
        message: String,
    },

    #[error("failed to generate {provider} URL: {message}")]
    Presign {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} API returned error (status code: {status}): {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("unexpected response: {0}")]
    Response(String),
}

/// Uniform contract over every remote storage system
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Backend: Send + Sync {
    /// Provider name used in logs and error messages
    fn name(&self) -> &'static str;

    /// Upload the file at `path` under `key` and return its URL
    async fn upload_file(&self, path: &Path, key: &str) -> Result<String, StorageError>;

    /// Upload the bytes read from `body` under `key` and return its URL
    async fn upload(&self, body: UploadBody, key: &str) -> Result<String, StorageError>;
}

/// Use the given key, or a random UUID when it is empty
pub(crate) fn object_key(key: &str) -> String {
    if key.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        key.to_string()
    }
}

/// Public URL for `key` under a custom domain
pub(crate) fn domain_url(domain: &str, key: &str) -> String {
    format!("{}/{}", domain.trim_end_matches('/'), key)
}

/// Percent-encode each `/`-separated segment of an object key
pub(crate) fn encode_key_path(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

pub(crate) async fn read_file(path: &Path) -> Result<Vec<u8>, StorageError> {
    tokio::fs::read(path).await.map_err(|source| StorageError::Open {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) async fn read_body(mut body: UploadBody) -> Result<Vec<u8>, StorageError> {
    let mut data = Vec::new();
    body.read_to_end(&mut data)
        .await
        .map_err(StorageError::Read)?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_falls_back_to_uuid() {
        assert_eq!(object_key("a/b.txt"), "a/b.txt");
        let generated = object_key("");
        assert!(Uuid::parse_str(&generated).is_ok());
    }

    #[test]
    fn test_domain_url_trims_trailing_slash() {
        assert_eq!(
            domain_url("https://cdn.example.com/", "2024/a.png"),
            "https://cdn.example.com/2024/a.png"
        );
        assert_eq!(
            domain_url("https://cdn.example.com", "a.png"),
            "https://cdn.example.com/a.png"
        );
    }

    #[test]
    fn test_encode_key_path_keeps_separators() {
        assert_eq!(
            encode_key_path("img/1700-notes #1.md"),
            "img/1700-notes%20%231.md"
        );
        assert_eq!(encode_key_path("a/b?c/d.png"), "a/b%3Fc/d.png");
    }

    #[test]
    fn test_not_configured_message_contains_reason() {
        let err = StorageError::NotConfigured("bucket missing".to_string());
        assert_eq!(
            err.to_string(),
            "storage service not configured or initialization failed. bucket missing"
        );
    }

    #[tokio::test]
    async fn test_read_file_missing() {
        let err = read_file(Path::new("/nonexistent/file-store/x.bin"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Open { .. }));
    }

    #[tokio::test]
    async fn test_read_body_error_is_read_error() {
        let body: UploadBody = Box::new(
            tokio_test::io::Builder::new()
                .read(b"par")
                .read_error(std::io::Error::other("connection reset"))
                .build(),
        );
        let err = read_body(body).await.unwrap_err();
        assert!(matches!(err, StorageError::Read(_)));
        assert_eq!(
            err.to_string(),
            "failed to read upload body: connection reset"
        );
    }

    #[tokio::test]
    async fn test_read_body() {
        let body: UploadBody = Box::new(&b"hello"[..]);
        assert_eq!(read_body(body).await.unwrap(), b"hello");
    }
}
