use crate::backend::{Backend, StorageError, UploadBody};
use crate::config::{StorageConfig, StorageKind};
use crate::key_format::KeyFormatter;
use crate::router::StorageRouter;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Facade over the active backend: formats the object key and forwards the upload
pub struct StorageService {
    router: StorageRouter,
    formatter: KeyFormatter,
}

impl StorageService {
    /// Resolve the backend once from configuration
    pub async fn new(config: &StorageConfig) -> Self {
        Self {
            router: StorageRouter::new(config).await,
            formatter: KeyFormatter::new(config.file_format.clone()),
        }
    }

    /// Use an already constructed backend
    pub fn with_backend(backend: Arc<dyn Backend>, kind: StorageKind, template: &str) -> Self {
        Self {
            router: StorageRouter::from_backend(backend, kind),
            formatter: KeyFormatter::new(template),
        }
    }

    pub fn router(&self) -> &StorageRouter {
        &self.router
    }

    /// Upload a local file; the key is derived from its base name
    #[instrument(skip(self), fields(backend = self.router.kind().as_str()))]
    pub async fn upload_file(&self, path: &Path) -> Result<String, StorageError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let key = self.formatter.format(&file_name);

        debug!(key = %key, "Uploading file");
        let url = self.router.backend().upload_file(path, &key).await?;
        info!(key = %key, "File uploaded");

        Ok(url)
    }

    /// Upload a byte stream under a key derived from `file_name`
    #[instrument(skip(self, body), fields(backend = self.router.kind().as_str()))]
    pub async fn upload(&self, body: UploadBody, file_name: &str) -> Result<String, StorageError> {
        let key = self.formatter.format(file_name);

        debug!(key = %key, "Uploading stream");
        let url = self.router.backend().upload(body, &key).await?;
        info!(key = %key, "Stream uploaded");

        Ok(url)
    }
}
