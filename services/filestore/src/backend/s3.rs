use super::{object_key, read_body, Backend, StorageError, UploadBody};
use crate::config::{url_expiration, ConfigError, S3Config};
use crate::content_type::get_content_type;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{
    Builder as S3ConfigBuilder, Credentials, Region, RequestChecksumCalculation,
    ResponseChecksumValidation,
};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

const PROVIDER: &str = "S3";

/// S3-compatible backend (AWS, MinIO, R2, ...) returning presigned GET URLs
pub struct S3Backend {
    client: S3Client,
    bucket: String,
    expiration: Duration,
}

impl S3Backend {
    /// Create a new S3 backend.
    ///
    /// Static credentials are used when both keys are set, otherwise the
    /// default AWS credential chain applies.
    pub async fn new(config: &S3Config) -> Result<Self, ConfigError> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if !config.region.is_empty() {
            loader = loader.region(Region::new(config.region.clone()));
        }
        let aws_config = loader.load().await;

        // S3-compatible services often reject the newer default checksums
        let mut s3_config_builder = S3ConfigBuilder::from(&aws_config)
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
            .response_checksum_validation(ResponseChecksumValidation::WhenRequired);

        if !config.access_key.is_empty() && !config.secret_key.is_empty() {
            s3_config_builder = s3_config_builder.credentials_provider(Credentials::new(
                config.access_key.clone(),
                config.secret_key.clone(),
                config.session_token.clone(),
                None,
                "file-store",
            ));
        }

        // Configure custom endpoint for MinIO/R2
        if let Some(ref endpoint_url) = config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint_url);
        }

        if config.force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let client = S3Client::from_conf(s3_config_builder.build());

        info!(
            bucket = %config.bucket,
            region = %config.region,
            endpoint = ?config.endpoint,
            "S3 backend initialized"
        );

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
            expiration: url_expiration(config.url_expiration_secs),
        })
    }

    async fn put(&self, body: ByteStream, key: &str) -> Result<String, StorageError> {
        let key = object_key(key);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(body)
            .content_type(get_content_type(&key))
            .send()
            .await
            .map_err(|e| StorageError::Upload {
                provider: PROVIDER,
                message: aws_sdk_s3::error::DisplayErrorContext(e).to_string(),
            })?;

        debug!(key = %key, bucket = %self.bucket, "Object stored in S3");

        self.presigned_url(&key).await
    }

    /// Generate a presigned GET URL for an object key
    async fn presigned_url(&self, key: &str) -> Result<String, StorageError> {
        let presigning_config =
            PresigningConfig::expires_in(self.expiration).map_err(|e| StorageError::Presign {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning_config)
            .await
            .map_err(|e| StorageError::Presign {
                provider: PROVIDER,
                message: aws_sdk_s3::error::DisplayErrorContext(e).to_string(),
            })?;

        Ok(presigned.uri().to_string())
    }
}

#[async_trait]
impl Backend for S3Backend {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn upload_file(&self, path: &Path, key: &str) -> Result<String, StorageError> {
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::Open {
                path: path.to_path_buf(),
                source: std::io::Error::other(e),
            })?;

        self.put(body, key).await
    }

    #[instrument(skip(self, body), fields(bucket = %self.bucket))]
    async fn upload(&self, body: UploadBody, key: &str) -> Result<String, StorageError> {
        let data = read_body(body).await?;
        self.put(ByteStream::from(data), key).await
    }
}
