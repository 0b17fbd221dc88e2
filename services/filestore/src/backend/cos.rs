use super::{domain_url, object_key, read_body, read_file, Backend, StorageError, UploadBody};
use crate::config::{url_expiration, ConfigError, CosConfig};
use crate::content_type::get_content_type;
use async_trait::async_trait;
use opendal::{services::Cos, Operator};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

const PROVIDER: &str = "COS";

/// Tencent COS backend
pub struct CosBackend {
    operator: Operator,
    bucket: String,
    domain: Option<String>,
    expiration: Duration,
}

impl CosBackend {
    pub fn new(config: &CosConfig) -> Result<Self, ConfigError> {
        if config.bucket.is_empty() {
            return Err(ConfigError::MissingField("FSM_COS_BUCKET".to_string()));
        }
        if config.secret_id.is_empty() || config.secret_key.is_empty() {
            return Err(ConfigError::MissingField(
                "FSM_COS_ACCESS_KEY / FSM_COS_SECRET_KEY".to_string(),
            ));
        }
        if !config.use_accelerate && config.region.is_empty() {
            return Err(ConfigError::MissingField("FSM_COS_REGION".to_string()));
        }

        let bucket = bucket_name(config);
        let endpoint = endpoint_url(config);
        let builder = Cos::default()
            .root("/")
            .bucket(&bucket)
            .endpoint(&endpoint)
            .secret_id(&config.secret_id)
            .secret_key(&config.secret_key);

        let operator = Operator::new(builder)
            .map_err(|e| ConfigError::Client(e.to_string()))?
            .finish();

        info!(
            bucket = %bucket,
            endpoint = %endpoint,
            domain = ?config.domain,
            "COS backend initialized"
        );

        Ok(Self {
            operator,
            bucket,
            domain: config.domain.clone(),
            expiration: url_expiration(config.url_expiration_secs),
        })
    }

    async fn put(&self, data: Vec<u8>, key: &str) -> Result<String, StorageError> {
        let key = object_key(key);

        self.operator
            .write_with(&key, data)
            .content_type(&get_content_type(&key))
            .await
            .map_err(|e| StorageError::Upload {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        debug!(key = %key, bucket = %self.bucket, "Object stored in COS");

        self.object_url(&key).await
    }

    /// Custom-domain URL when configured, a presigned GET otherwise
    async fn object_url(&self, key: &str) -> Result<String, StorageError> {
        match self.domain {
            Some(ref domain) => Ok(domain_url(domain, key)),
            None => {
                let presigned = self
                    .operator
                    .presign_read(key, self.expiration)
                    .await
                    .map_err(|e| StorageError::Presign {
                        provider: PROVIDER,
                        message: e.to_string(),
                    })?;
                Ok(presigned.uri().to_string())
            }
        }
    }
}

#[async_trait]
impl Backend for CosBackend {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn upload_file(&self, path: &Path, key: &str) -> Result<String, StorageError> {
        let data = read_file(path).await?;
        self.put(data, key).await
    }

    #[instrument(skip(self, body), fields(bucket = %self.bucket))]
    async fn upload(&self, body: UploadBody, key: &str) -> Result<String, StorageError> {
        let data = read_body(body).await?;
        self.put(data, key).await
    }
}

/// Full bucket name: `<bucket>-<appid>`, unless the bucket already carries the app id
fn bucket_name(config: &CosConfig) -> String {
    if config.app_id.is_empty() || config.bucket.ends_with(&format!("-{}", config.app_id)) {
        config.bucket.clone()
    } else {
        format!("{}-{}", config.bucket, config.app_id)
    }
}

/// Service endpoint, regional or global acceleration
fn endpoint_url(config: &CosConfig) -> String {
    let scheme = if config.use_https { "https" } else { "http" };
    if config.use_accelerate {
        format!("{}://cos.accelerate.myqcloud.com", scheme)
    } else {
        format!("{}://cos.{}.myqcloud.com", scheme, config.region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> CosConfig {
        CosConfig {
            bucket: "media".to_string(),
            region: "ap-guangzhou".to_string(),
            app_id: "1250000000".to_string(),
            secret_id: "test-id".to_string(),
            secret_key: "test-key".to_string(),
            domain: None,
            use_https: true,
            use_accelerate: false,
            url_expiration_secs: 0,
        }
    }

    #[test]
    fn test_bucket_name_appends_app_id() {
        assert_eq!(bucket_name(&test_config()), "media-1250000000");

        let already_suffixed = CosConfig {
            bucket: "media-1250000000".to_string(),
            ..test_config()
        };
        assert_eq!(bucket_name(&already_suffixed), "media-1250000000");
    }

    #[test]
    fn test_endpoint_url_variants() {
        assert_eq!(
            endpoint_url(&test_config()),
            "https://cos.ap-guangzhou.myqcloud.com"
        );

        let plain = CosConfig {
            use_https: false,
            ..test_config()
        };
        assert_eq!(endpoint_url(&plain), "http://cos.ap-guangzhou.myqcloud.com");

        let accelerated = CosConfig {
            use_accelerate: true,
            ..test_config()
        };
        assert_eq!(
            endpoint_url(&accelerated),
            "https://cos.accelerate.myqcloud.com"
        );
    }

    #[test]
    fn test_requires_bucket_and_credentials() {
        let no_bucket = CosConfig {
            bucket: String::new(),
            ..test_config()
        };
        assert!(CosBackend::new(&no_bucket)
            .err()
            .unwrap()
            .to_string()
            .contains("FSM_COS_BUCKET"));

        let no_key = CosConfig {
            secret_id: String::new(),
            ..test_config()
        };
        assert!(matches!(
            CosBackend::new(&no_key).err().unwrap(),
            ConfigError::MissingField(_)
        ));
    }

    #[test]
    fn test_builds_with_full_config() {
        let backend = CosBackend::new(&test_config()).unwrap();
        assert_eq!(backend.bucket, "media-1250000000");
        assert_eq!(backend.expiration, Duration::from_secs(604800));
    }

    #[tokio::test]
    async fn test_object_url_is_presigned_on_bucket_host() {
        let backend = CosBackend::new(&test_config()).unwrap();
        let url = backend.object_url("2024/a.png").await.unwrap();
        assert!(url.starts_with("https://media-1250000000.cos.ap-guangzhou.myqcloud.com/2024/a.png?"));
    }

    #[tokio::test]
    async fn test_object_url_follows_https_flag() {
        let backend = CosBackend::new(&CosConfig {
            use_https: false,
            ..test_config()
        })
        .unwrap();
        let url = backend.object_url("a.png").await.unwrap();
        assert!(url.starts_with("http://media-1250000000.cos.ap-guangzhou.myqcloud.com/a.png?"));
    }

    #[tokio::test]
    async fn test_object_url_uses_custom_domain() {
        let backend = CosBackend::new(&CosConfig {
            domain: Some("https://cdn.example.com".to_string()),
            ..test_config()
        })
        .unwrap();
        let url = backend.object_url("2024/a.png").await.unwrap();
        assert_eq!(url, "https://cdn.example.com/2024/a.png");
    }
}
