use super::{domain_url, object_key, read_body, read_file, Backend, StorageError, UploadBody};
use crate::config::{url_expiration, ConfigError, OssConfig};
use crate::content_type::get_content_type;
use async_trait::async_trait;
use opendal::{services::Oss, Operator};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

const PROVIDER: &str = "OSS";

/// Aliyun OSS backend
pub struct OssBackend {
    operator: Operator,
    bucket: String,
    domain: Option<String>,
    expiration: Duration,
}

impl OssBackend {
    pub fn new(config: &OssConfig) -> Result<Self, ConfigError> {
        if config.endpoint.is_empty() {
            return Err(ConfigError::MissingField("FSM_OSS_ENDPOINT".to_string()));
        }
        if config.bucket.is_empty() {
            return Err(ConfigError::MissingField("FSM_OSS_BUCKET".to_string()));
        }
        if config.access_key.is_empty() || config.secret_key.is_empty() {
            return Err(ConfigError::MissingField(
                "FSM_OSS_ACCESS_KEY / FSM_OSS_SECRET_KEY".to_string(),
            ));
        }

        let endpoint = with_scheme(&config.endpoint);
        let builder = Oss::default()
            .root("/")
            .bucket(&config.bucket)
            .endpoint(&endpoint)
            .access_key_id(&config.access_key)
            .access_key_secret(&config.secret_key);

        let operator = Operator::new(builder)
            .map_err(|e| ConfigError::Client(e.to_string()))?
            .finish();

        info!(
            bucket = %config.bucket,
            endpoint = %endpoint,
            domain = ?config.domain,
            "OSS backend initialized"
        );

        Ok(Self {
            operator,
            bucket: config.bucket.clone(),
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

        debug!(key = %key, bucket = %self.bucket, "Object stored in OSS");

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
impl Backend for OssBackend {
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

/// Prefix `https://` when the endpoint has no scheme
fn with_scheme(endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("https://{}", endpoint)
    }
}
