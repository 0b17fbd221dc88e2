//! Upload operations exposed to callers.
//!
//! Each operation works through its inputs sequentially in input order and
//! stops at the first failure.

use crate::backend::StorageError;
use crate::clipboard::{
    ClipboardError, ClipboardResolver, SystemClipboard, DEFAULT_CLIPBOARD_TIMEOUT,
};
use crate::config::StorageConfig;
use crate::download::{DownloadError, Downloader};
use crate::service::StorageService;
use crate::validator::{validate_paths, ValidationError};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};

/// Errors surfaced by the upload operations
#[derive(Error, Debug)]
pub enum FileStoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("failed to get files from clipboard: {0}")]
    Clipboard(#[from] ClipboardError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error("urls cannot be empty")]
    EmptyUrls,

    #[error("failed to upload file from {url}: {source}")]
    UrlUpload {
        url: String,
        #[source]
        source: StorageError,
    },
}

/// Where the uploaded files came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadSource {
    Files,
    Clipboard,
    Urls,
}

/// Outcome of one upload operation: one URL per input, in input order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub source: UploadSource,
    pub urls: Vec<String>,
}

impl UploadReport {
    pub fn new(source: UploadSource, urls: Vec<String>) -> Self {
        Self { source, urls }
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

impl fmt::Display for UploadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.urls.len();
        match self.source {
            UploadSource::Clipboard if count == 0 => {
                return write!(f, "No files found in clipboard.");
            }
            UploadSource::Files => writeln!(f, "Upload {} files successfully:", count)?,
            UploadSource::Clipboard => {
                writeln!(f, "Upload {} files from clipboard successfully:", count)?
            }
            UploadSource::Urls => {
                writeln!(f, "Downloaded and uploaded {} files successfully:", count)?
            }
        }
        for (i, url) in self.urls.iter().enumerate() {
            writeln!(f, "{}: {}", i + 1, url)?;
        }
        Ok(())
    }
}

/// Entry point for uploading local, clipboard and remote files
pub struct FileStore {
    service: StorageService,
    clipboard: Arc<dyn ClipboardResolver>,
    downloader: Downloader,
    clipboard_timeout: Duration,
}

impl FileStore {
    pub fn new(
        service: StorageService,
        clipboard: Arc<dyn ClipboardResolver>,
        downloader: Downloader,
    ) -> Self {
        Self {
            service,
            clipboard,
            downloader,
            clipboard_timeout: DEFAULT_CLIPBOARD_TIMEOUT,
        }
    }

    /// Build from configuration with the system clipboard
    pub async fn from_config(config: &StorageConfig) -> Result<Self, FileStoreError> {
        let service = StorageService::new(config).await;
        let downloader = Downloader::new()?;
        Ok(Self::new(
            service,
            Arc::new(SystemClipboard::new()),
            downloader,
        ))
    }

    pub fn with_clipboard_timeout(mut self, timeout: Duration) -> Self {
        self.clipboard_timeout = timeout;
        self
    }

    pub fn service(&self) -> &StorageService {
        &self.service
    }

    /// Validate every path, then upload them one by one
    #[instrument(skip(self))]
    pub async fn upload_files(&self, paths: &[String]) -> Result<UploadReport, FileStoreError> {
        let validated = validate_paths(paths)?;
        let urls = self.upload_validated(&validated).await?;

        info!(count = urls.len(), "Uploaded files");
        Ok(UploadReport::new(UploadSource::Files, urls))
    }

    /// Upload whatever files the clipboard currently references
    #[instrument(skip(self))]
    pub async fn upload_clipboard_files(&self) -> Result<UploadReport, FileStoreError> {
        let candidates = self.clipboard.get_files(self.clipboard_timeout).await?;
        if candidates.is_empty() {
            info!("No files found in clipboard");
            return Ok(UploadReport::new(UploadSource::Clipboard, Vec::new()));
        }

        let validated = validate_paths(&candidates)?;
        let urls = self.upload_validated(&validated).await?;

        info!(count = urls.len(), "Uploaded clipboard files");
        Ok(UploadReport::new(UploadSource::Clipboard, urls))
    }

    /// Download each URL to a temporary file and upload it
    #[instrument(skip(self))]
    pub async fn upload_url_files(&self, urls: &[String]) -> Result<UploadReport, FileStoreError> {
        if urls.is_empty() {
            return Err(FileStoreError::EmptyUrls);
        }

        let mut uploaded = Vec::with_capacity(urls.len());
        for url in urls {
            // Dropped at the end of each iteration, removing the temp file
            let downloaded = self.downloader.download(url).await?;

            let file = tokio::fs::File::open(downloaded.path())
                .await
                .map_err(|e| FileStoreError::Download(DownloadError::Write(e)))?;

            let remote = self
                .service
                .upload(Box::new(file), downloaded.file_name())
                .await
                .map_err(|source| FileStoreError::UrlUpload {
                    url: url.clone(),
                    source,
                })?;
            uploaded.push(remote);
        }

        info!(count = uploaded.len(), "Uploaded downloaded files");
        Ok(UploadReport::new(UploadSource::Urls, uploaded))
    }

    async fn upload_validated(&self, paths: &[PathBuf]) -> Result<Vec<String>, FileStoreError> {
        let mut urls = Vec::with_capacity(paths.len());
        for path in paths {
            urls.push(self.service.upload_file(path).await?);
        }
        Ok(urls)
    }
}
