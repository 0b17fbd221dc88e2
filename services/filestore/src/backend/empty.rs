use super::{Backend, StorageError, UploadBody};
use async_trait::async_trait;
use std::path::Path;

/// Fallback backend used when nothing is configured or construction failed.
///
/// Every call fails with the stored reason.
#[derive(Debug, Clone, Default)]
pub struct EmptyBackend {
    reason: String,
}

impl EmptyBackend {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    fn error(&self) -> StorageError {
        StorageError::NotConfigured(self.reason.clone())
    }
}

#[async_trait]
impl Backend for EmptyBackend {
    fn name(&self) -> &'static str {
        "empty"
    }

    async fn upload_file(&self, _path: &Path, _key: &str) -> Result<String, StorageError> {
        Err(self.error())
    }

    async fn upload(&self, _body: UploadBody, _key: &str) -> Result<String, StorageError> {
        Err(self.error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_file_fails_with_reason() {
        let backend = EmptyBackend::new("Missing required configuration: FSM_QINIU_DOMAIN");
        let err = backend
            .upload_file(Path::new("/tmp/a.txt"), "a.txt")
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("storage service not configured or initialization failed."));
        assert!(message.contains("FSM_QINIU_DOMAIN"));
    }

    #[tokio::test]
    async fn test_upload_fails_without_reading_body() {
        let backend = EmptyBackend::default();
        let err = backend
            .upload(Box::new(&b"data"[..]), "a.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotConfigured(ref r) if r.is_empty()));
    }
}
