//! Backend selection.
//!
//! The router builds exactly one backend from configuration. Construction
//! failures never abort the process: the router logs them and installs an
//! [`EmptyBackend`] carrying the failure text instead.

use crate::backend::{
    Backend, CosBackend, EmptyBackend, GitHubBackend, OssBackend, QiniuBackend, S3Backend,
};
use crate::config::{BackendConfig, ConfigError, StorageConfig, StorageKind};
use std::sync::Arc;
use tracing::{info, warn};

/// Owns the active backend for the lifetime of the process
pub struct StorageRouter {
    backend: Arc<dyn Backend>,
    kind: StorageKind,
    init_error: Option<String>,
}

impl StorageRouter {
    /// Build the configured backend, falling back to the empty backend on failure
    pub async fn new(config: &StorageConfig) -> Self {
        let kind = config.backend.kind();

        match build_backend(&config.backend).await {
            Ok(backend) => {
                info!(storage_type = kind.as_str(), "Storage backend selected");
                Self {
                    backend,
                    kind,
                    init_error: None,
                }
            }
            Err(e) => {
                let reason = e.to_string();
                warn!(
                    storage_type = kind.as_str(),
                    error = %reason,
                    "Storage backend initialization failed, using empty backend"
                );
                Self {
                    backend: Arc::new(EmptyBackend::new(reason.clone())),
                    kind: StorageKind::Empty,
                    init_error: Some(reason),
                }
            }
        }
    }

    /// Wrap an already constructed backend
    pub fn from_backend(backend: Arc<dyn Backend>, kind: StorageKind) -> Self {
        Self {
            backend,
            kind,
            init_error: None,
        }
    }

    pub fn backend(&self) -> Arc<dyn Backend> {
        Arc::clone(&self.backend)
    }

    /// Kind of the backend actually in use
    pub fn kind(&self) -> StorageKind {
        self.kind
    }

    /// Why the configured backend could not be built, if it failed
    pub fn init_error(&self) -> Option<&str> {
        self.init_error.as_deref()
    }
}

/// Select the backend for `config`; never fails
pub async fn select_backend(config: &StorageConfig) -> Arc<dyn Backend> {
    StorageRouter::new(config).await.backend()
}

async fn build_backend(config: &BackendConfig) -> Result<Arc<dyn Backend>, ConfigError> {
    let backend: Arc<dyn Backend> = match config {
        BackendConfig::Empty => Arc::new(EmptyBackend::default()),
        BackendConfig::S3(c) => Arc::new(S3Backend::new(c).await?),
        BackendConfig::Oss(c) => Arc::new(OssBackend::new(c)?),
        BackendConfig::Cos(c) => Arc::new(CosBackend::new(c)?),
        BackendConfig::Qiniu(c) => Arc::new(QiniuBackend::new(c)?),
        BackendConfig::GitHub(c) => Arc::new(GitHubBackend::new(c)?),
        BackendConfig::Invalid { setting, .. } => return Err(setting.clone().into()),
    };
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::StorageError;
    use crate::config::Settings;
    use std::path::Path;

    fn config_for(settings: Settings) -> StorageConfig {
        StorageConfig::from_settings(&settings)
    }

    #[tokio::test]
    async fn test_unknown_provider_selects_empty() {
        let config = config_for(Settings {
            storage_type: "unknown-provider".to_string(),
            ..Settings::default()
        });

        let router = StorageRouter::new(&config).await;
        assert_eq!(router.kind(), StorageKind::Empty);
        assert!(router.init_error().is_none());

        let err = router
            .backend()
            .upload_file(Path::new("/tmp/a.txt"), "a.txt")
            .await
            .unwrap_err();
        match err {
            StorageError::NotConfigured(reason) => assert!(reason.is_empty()),
            other => panic!("Expected NotConfigured, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_discriminator_selects_empty() {
        let config = config_for(Settings {
            storage_type: String::new(),
            ..Settings::default()
        });
        let backend = select_backend(&config).await;
        assert_eq!(backend.name(), "empty");
    }

    #[tokio::test]
    async fn test_qiniu_without_domain_falls_back_with_reason() {
        let config = config_for(Settings {
            storage_type: "QINIU".to_string(),
            qiniu_access_key: "ak".to_string(),
            qiniu_secret_key: "sk".to_string(),
            qiniu_bucket: "media".to_string(),
            ..Settings::default()
        });

        let router = StorageRouter::new(&config).await;
        assert_eq!(router.kind(), StorageKind::Empty);
        assert!(router.init_error().unwrap().contains("FSM_QINIU_DOMAIN"));

        let err = router
            .backend()
            .upload(Box::new(&b"x"[..]), "a.txt")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("FSM_QINIU_DOMAIN"));
        assert!(err
            .to_string()
            .starts_with("storage service not configured or initialization failed."));
    }

    #[tokio::test]
    async fn test_github_without_token_falls_back() {
        let config = config_for(Settings {
            storage_type: "github".to_string(),
            github_owner: "octo".to_string(),
            github_repo: "assets".to_string(),
            ..Settings::default()
        });

        let router = StorageRouter::new(&config).await;
        assert_eq!(router.backend().name(), "empty");
        assert!(router.init_error().unwrap().contains("FSM_GITHUB_TOKEN"));
    }

    #[tokio::test]
    async fn test_complete_github_config_selects_github() {
        let config = config_for(Settings {
            storage_type: "github".to_string(),
            github_token: "ghp_test".to_string(),
            github_owner: "octo".to_string(),
            github_repo: "assets".to_string(),
            ..Settings::default()
        });

        let router = StorageRouter::new(&config).await;
        assert_eq!(router.kind(), StorageKind::GitHub);
        assert_eq!(router.backend().name(), "GitHub");
    }

    #[tokio::test]
    async fn test_s3_is_constructible_without_bucket_or_credentials() {
        let config = config_for(Settings {
            storage_type: "s3".to_string(),
            s3_region: "us-east-1".to_string(),
            ..Settings::default()
        });

        let router = StorageRouter::new(&config).await;
        assert_eq!(router.kind(), StorageKind::S3);
        assert!(router.init_error().is_none());
    }

    #[tokio::test]
    async fn test_oss_missing_credentials_falls_back() {
        let config = config_for(Settings {
            storage_type: "oss".to_string(),
            oss_endpoint: "oss-cn-hangzhou.aliyuncs.com".to_string(),
            oss_bucket: "media".to_string(),
            ..Settings::default()
        });

        let router = StorageRouter::new(&config).await;
        assert_eq!(router.kind(), StorageKind::Empty);
        assert!(router.init_error().unwrap().contains("FSM_OSS_ACCESS_KEY"));
    }

    #[tokio::test]
    async fn test_unparsable_setting_falls_back_with_field_name() {
        let settings = Settings::from_vars(
            [
                ("FSM_STORAGE_TYPE", "cos"),
                ("FSM_COS_BUCKET", "media"),
                ("FSM_COS_URL_EXPIRATION", "7d"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        )
        .unwrap();

        let router = StorageRouter::new(&config_for(settings)).await;
        assert_eq!(router.kind(), StorageKind::Empty);
        let reason = router.init_error().unwrap();
        assert!(reason.contains("FSM_COS_URL_EXPIRATION"));
        assert!(reason.contains("7d"));
    }
}
