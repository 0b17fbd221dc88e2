use std::io;
use std::path::Path;
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};
use url::Url;

/// Name used when a URL has no usable last path segment
const FALLBACK_FILE_NAME: &str = "download";

/// URL download failures
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("failed to download file from {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to download file from {url}: status code {status}")]
    Status { url: String, status: u16 },

    #[error("failed to create temp file: {0}")]
    TempFile(#[source] io::Error),

    #[error("failed to save downloaded file: {0}")]
    Write(#[source] io::Error),
}

/// A downloaded file living in a temporary location.
///
/// The file is removed when this value is dropped.
#[derive(Debug)]
pub struct DownloadedFile {
    file: NamedTempFile,
    file_name: String,
    size: u64,
}

impl DownloadedFile {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// File name taken from the URL
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Fetches remote files into scoped temporary files
#[derive(Clone)]
pub struct Downloader {
    client: reqwest::Client,
}

impl Downloader {
    pub fn new() -> Result<Self, DownloadError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(DownloadError::Client)?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// GET `url` into a new temporary file. Only `200 OK` is accepted.
    #[instrument(skip(self))]
    pub async fn download(&self, url: &str) -> Result<DownloadedFile, DownloadError> {
        let file_name = file_name_from_url(url);
        let temp = tempfile::Builder::new()
            .prefix("file-store-")
            .tempfile()
            .map_err(DownloadError::TempFile)?;

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| DownloadError::Request {
                url: url.to_string(),
                source,
            })?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let std_file = temp.reopen().map_err(DownloadError::TempFile)?;
        let mut out = tokio::fs::File::from_std(std_file);
        let mut size = 0u64;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|source| DownloadError::Request {
                url: url.to_string(),
                source,
            })?
        {
            out.write_all(&chunk).await.map_err(DownloadError::Write)?;
            size += chunk.len() as u64;
        }
        out.flush().await.map_err(DownloadError::Write)?;

        debug!(file_name = %file_name, size_bytes = size, "Download complete");

        Ok(DownloadedFile {
            file: temp,
            file_name,
            size,
        })
    }
}

/// Last non-empty path segment of a URL, percent-decoded
pub fn file_name_from_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last().map(String::from))
        })
        .and_then(|segment| urlencoding::decode(&segment).ok().map(|s| s.into_owned()))
        .filter(|name| !name.is_empty() && !name.contains('/'))
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string())
}
